//! Analyze command
//!
//! Scans the project, runs the analyzer set, and prints the report.

use crate::analysis::engine::{AnalysisEngine, AnalysisReport, EngineOptions};
use crate::analysis::issue::Severity;
use crate::core::config::WardenConfig;
use crate::core::error::{ExitCode, WardenError, WardenResult};
use crate::core::files::FileScanner;
use crate::ui::progress::AnalysisProgress;
use std::path::Path;
use std::sync::Mutex;

/// Run analysis over a project root
pub fn run_analyze(
  root: &Path,
  comprehensive: bool,
  threshold: &str,
  json: bool,
  strict: bool,
) -> WardenResult<()> {
  let threshold = Severity::parse(threshold).ok_or_else(|| {
    WardenError::with_help(
      format!("Invalid severity threshold: {}", threshold),
      "Valid thresholds: low, medium, high, critical",
    )
  })?;

  let config = WardenConfig::load(root)?;
  let files = FileScanner::new(root, &config.scan)?.scan()?;
  let engine = AnalysisEngine::new(config);

  if !json {
    let mode = if comprehensive { "comprehensive" } else { "core" };
    println!("🔍 Analyzing {} files ({} pass)...\n", files.len(), mode);
  }

  let bar = if json || files.is_empty() {
    None
  } else {
    Some(Mutex::new(AnalysisProgress::new(files.len(), "analyzing")))
  };
  let progress = |snapshot: &crate::ui::progress::ProgressSnapshot| {
    if let Some(bar) = &bar
      && let Ok(mut bar) = bar.lock()
    {
      bar.set(snapshot.current);
    }
  };

  let report = engine.run(
    &files,
    &EngineOptions {
      comprehensive,
      threshold,
      progress: Some(&progress),
      ..EngineOptions::default()
    },
  )?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&report);
  }

  if strict && !report.issues.is_empty() {
    std::process::exit(ExitCode::Validation.as_i32());
  }
  Ok(())
}

fn print_report(report: &AnalysisReport) {
  for issue in &report.issues {
    let icon = match issue.severity {
      Severity::Critical => "❌",
      Severity::High => "❌",
      Severity::Medium => "⚠️ ",
      Severity::Low => "ℹ️ ",
    };
    let location = match issue.line {
      Some(line) => format!("{}:{}", issue.file.display(), line),
      None => issue.file.display().to_string(),
    };
    println!("{} [{}] {} ({})", icon, issue.severity, issue.title, location);
    if let Some(suggestion) = &issue.suggestion {
      println!("   💡 {}", suggestion);
    }
  }

  println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
  let s = &report.summary;
  println!(
    "Summary: {} issues reported ({} total, {} auto-fixable) across {} files",
    s.reported_issues, s.total_issues, s.auto_fixable, s.files_analyzed
  );
  for (severity, count) in s.by_severity.iter().rev() {
    println!("   {} {}", count, severity);
  }

  let m = &report.metrics;
  println!("\nMetrics:");
  println!("   tech debt score:  {:.1}/100", m.tech_debt_score);
  println!("   remediation:      {:.1}h estimated", m.remediation_hours);
  println!("   test coverage:    {:.0}%", m.test_coverage_ratio * 100.0);
  println!("   duplication:      {:.1}%", m.duplicate_line_ratio * 100.0);
  println!(
    "   dependencies:     {} internal, {} external",
    m.internal_dependencies, m.external_dependencies
  );
  println!("\nCompleted in {:.2}s", report.duration.as_secs_f64());

  if report.summary.auto_fixable > 0 {
    println!("\n💡 Run `warden fix` to preview automatic fixes.");
  }
}
