//! Fix command
//!
//! Collects auto-fixable findings, builds a change set, and hands it to the
//! safety manager. Dry-run by default; --apply runs the full transactional
//! protocol (backup, gate, apply, gate, commit).

use crate::analysis::engine::{AnalysisEngine, EngineOptions};
use crate::analysis::issue::Issue;
use crate::bulk::{BulkOptions, process_bulk};
use crate::core::config::WardenConfig;
use crate::core::error::{WardenError, WardenResult};
use crate::core::files::{FileRecord, FileScanner};
use crate::safety::changes::FileChange;
use crate::safety::manager::SafetyManager;
use crate::safety::test_gate::StaticGate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Run the fix flow
pub fn run_fix(root: &Path, apply: bool, no_verify: bool) -> WardenResult<()> {
  let config = WardenConfig::load(root)?;
  let files = FileScanner::new(root, &config.scan)?.scan()?;
  let engine = AnalysisEngine::new(config.clone());

  let report = engine.run(&files, &EngineOptions::default())?;
  let fixable: Vec<&Issue> = report.issues.iter().filter(|i| i.auto_fixable).collect();

  if fixable.is_empty() {
    println!("✨ No auto-fixable issues found.");
    return Ok(());
  }

  let changes = build_changes(&files, &fixable)?;
  let targets: Vec<PathBuf> = changes.iter().map(|c| c.path.clone()).collect();

  println!(
    "🔧 {} auto-fixable issue(s) across {} file(s)\n",
    fixable.len(),
    changes.len()
  );

  if !apply {
    // Pure preview: no operation, no backup, no gate
    println!("{}", crate::safety::changes::preview(&changes));
    println!("Dry run: no files were modified. Re-run with --apply to write these changes.");
    return Ok(());
  }

  let mut manager = SafetyManager::new(root, &config);
  if no_verify {
    manager = manager.with_gate(Box::new(StaticGate::skipped()));
  }

  let start = manager.start_operation("auto-fix", &targets)?;
  for warning in &start.warnings {
    println!("⚠️  {}", warning);
  }

  let result = manager.apply_changes(&start.operation_id, &changes, true)?;

  println!("✅ Applied fixes to {} file(s)", result.files_changed);
  println!(
    "   Operation {} committed. Roll back with `warden rollback {}`.",
    result.operation_id, result.operation_id
  );
  Ok(())
}

/// One modify-change per file, applying every fixable issue in that file.
///
/// Files are processed through the bulk executor: a single unreadable file
/// is reported and skipped, not fatal to the whole fix run.
fn build_changes(files: &[FileRecord], fixable: &[&Issue]) -> WardenResult<Vec<FileChange>> {
  let mut by_file: BTreeMap<PathBuf, Vec<Issue>> = BTreeMap::new();
  for issue in fixable {
    by_file.entry(issue.file.clone()).or_default().push((*issue).clone());
  }
  let items: Vec<(PathBuf, Vec<Issue>)> = by_file.into_iter().collect();

  let report = process_bulk(
    &items,
    |(path, issues)| -> Result<Option<FileChange>, WardenError> {
      let record = match files.iter().find(|f| f.relative == *path) {
        Some(r) => r,
        None => return Ok(None),
      };
      let original = record.read()?;
      let refs: Vec<&Issue> = issues.iter().collect();
      let fixed = apply_fixes(&original, &refs);
      if fixed != original {
        Ok(Some(FileChange::modify(path.clone(), original, fixed)))
      } else {
        Ok(None)
      }
    },
    &BulkOptions::default(),
  );

  for failure in &report.errors {
    println!("⚠️  Skipping {}: {}", failure.item.0.display(), failure.error);
  }

  Ok(report.results.into_iter().flatten().collect())
}

fn apply_fixes(content: &str, issues: &[&Issue]) -> String {
  let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
  for issue in issues {
    if issue.issue_type == "trailing-whitespace"
      && let Some(line) = issue.line
      && let Some(text) = lines.get_mut(line - 1)
    {
      *text = text.trim_end().to_string();
    }
  }
  let mut out = lines.join("\n");
  if content.ends_with('\n') {
    out.push('\n');
  }
  out
}
