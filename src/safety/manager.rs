//! Transactional application of file changes.
//!
//! Every mutating operation follows the same protocol: validate, back up,
//! gate, apply, gate again, commit. A failure after writes begin always
//! restores the backup before the error is surfaced, so the caller never has
//! to reason about a half-applied change set.

use crate::core::config::WardenConfig;
use crate::core::error::{SafetyError, ValidationError, WardenError, WardenResult};
use crate::safety::changes::{ChangeKind, FileChange, order_changes, preview};
use crate::safety::test_gate::{CommandGate, Gate, GateOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files whose modification deserves an explicit warning
const CRITICAL_FILES: &[&str] = &[
  "package.json",
  "package-lock.json",
  "Cargo.toml",
  "Cargo.lock",
  ".env",
  "tsconfig.json",
];

/// Operation lifecycle. Transitions are linear; Committed and RolledBack are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
  Started,
  BackedUp,
  TestGated,
  Applying,
  Committed,
  RolledBack,
}

/// An in-flight or finished operation
#[derive(Debug, Clone)]
pub struct Operation {
  pub id: String,
  pub description: String,
  /// Target files, relative to the project root
  pub files: Vec<PathBuf>,
  pub state: OperationState,
  pub started_at: DateTime<Utc>,
}

/// On-disk record of what a backup contains. Written before any target file
/// is touched.
#[derive(Debug, Serialize, Deserialize)]
struct BackupManifest {
  operation_id: String,
  description: String,
  created_at: DateTime<Utc>,
  files: Vec<BackupEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BackupEntry {
  path: PathBuf,
  /// Whether the file existed when the backup was taken. Files created by
  /// the operation are deleted on rollback.
  existed: bool,
}

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
  operation_id: &'a str,
  timestamp: DateTime<Utc>,
  outcome: &'a str,
  files: usize,
  paths: &'a [PathBuf],
}

/// Result of starting an operation
#[derive(Debug)]
pub struct StartReport {
  pub operation_id: String,
  /// Critical-file warnings; the operation proceeds regardless
  pub warnings: Vec<String>,
  pub gate: GateOutcome,
}

/// Result of applying (or previewing) a change set
#[derive(Debug)]
pub struct ApplyReport {
  pub operation_id: String,
  pub applied: bool,
  pub preview: String,
  pub files_changed: usize,
}

/// Owns operation state, backups, the test gate, and the audit log.
pub struct SafetyManager {
  project_root: PathBuf,
  workdir: PathBuf,
  max_files: usize,
  gate: Box<dyn Gate>,
  operations: HashMap<String, Operation>,
}

impl SafetyManager {
  pub fn new(project_root: impl Into<PathBuf>, config: &WardenConfig) -> Self {
    let project_root = project_root.into();
    let workdir = config.workdir(&project_root);
    Self {
      project_root,
      workdir,
      max_files: config.safety.max_files,
      gate: Box::new(CommandGate::new(Duration::from_secs(config.safety.test_timeout_secs))),
      operations: HashMap::new(),
    }
  }

  /// Replace the gate. Seam for tests and for disabling verification.
  pub fn with_gate(mut self, gate: Box<dyn Gate>) -> Self {
    self.gate = gate;
    self
  }

  pub fn operation(&self, operation_id: &str) -> Option<&Operation> {
    self.operations.get(operation_id)
  }

  /// Begin an operation over `files`: validate, back up, run the pre-gate.
  ///
  /// Validation failures are guaranteed side-effect free; nothing is written
  /// to the workdir before the file-count check passes.
  pub fn start_operation(&mut self, description: &str, files: &[PathBuf]) -> WardenResult<StartReport> {
    let operation_id = derive_operation_id(description, files);

    if files.is_empty() {
      return Err(WardenError::Validation(ValidationError::NothingToDo { operation_id }));
    }
    if files.len() > self.max_files {
      return Err(WardenError::Validation(ValidationError::TooManyFiles {
        requested: files.len(),
        max_files: self.max_files,
      }));
    }

    let warnings = files
      .iter()
      .filter(|f| {
        f.file_name()
          .map(|n| CRITICAL_FILES.iter().any(|c| *c == n.to_string_lossy()))
          .unwrap_or(false)
      })
      .map(|f| format!("Operation touches critical file {}", f.display()))
      .collect();

    let mut operation = Operation {
      id: operation_id.clone(),
      description: description.to_string(),
      files: files.to_vec(),
      state: OperationState::Started,
      started_at: Utc::now(),
    };

    self.create_backup(&operation)?;
    operation.state = OperationState::BackedUp;

    let gate = self.gate.run(&self.project_root)?;
    if let GateOutcome::Failed { command, detail } = &gate {
      self.operations.insert(operation_id.clone(), operation);
      self.audit(&operation_id, "blocked", files)?;
      return Err(WardenError::Safety(SafetyError::GateBlocked {
        operation_id,
        command: command.clone(),
        detail: detail.clone(),
      }));
    }

    operation.state = OperationState::TestGated;
    self.operations.insert(operation_id.clone(), operation);
    self.audit(&operation_id, "started", files)?;

    Ok(StartReport {
      operation_id,
      warnings,
      gate,
    })
  }

  /// Apply a change set under an operation, or preview it when `apply` is
  /// false. A preview has no side effects at all.
  ///
  /// Any write failure or post-apply gate failure rolls back every file
  /// before returning.
  pub fn apply_changes(&mut self, operation_id: &str, changes: &[FileChange], apply: bool) -> WardenResult<ApplyReport> {
    if !self.operations.contains_key(operation_id) {
      return Err(WardenError::Validation(ValidationError::OperationNotFound {
        operation_id: operation_id.to_string(),
      }));
    }
    if changes.is_empty() {
      return Err(WardenError::Validation(ValidationError::NothingToDo {
        operation_id: operation_id.to_string(),
      }));
    }

    let rendered = preview(changes);
    let files_changed = changes.iter().map(|c| c.path.clone()).collect::<BTreeSet<_>>().len();

    if !apply {
      return Ok(ApplyReport {
        operation_id: operation_id.to_string(),
        applied: false,
        preview: rendered,
        files_changed,
      });
    }

    self.set_state(operation_id, OperationState::Applying);

    for change in order_changes(changes) {
      if let Err(err) = self.write_change(&change) {
        return Err(self.fail_and_rollback(operation_id, format!("writing {}: {}", change.path.display(), err)));
      }
    }

    match self.gate.run(&self.project_root)? {
      GateOutcome::Failed { command, detail } => {
        return Err(self.fail_and_rollback(
          operation_id,
          format!("post-apply test gate failed (`{}`): {}", command, detail),
        ));
      }
      GateOutcome::Passed { .. } | GateOutcome::Skipped { .. } => {}
    }

    self.set_state(operation_id, OperationState::Committed);
    let paths: Vec<PathBuf> = changes.iter().map(|c| c.path.clone()).collect();
    self.audit(operation_id, "committed", &paths)?;

    Ok(ApplyReport {
      operation_id: operation_id.to_string(),
      applied: true,
      preview: rendered,
      files_changed,
    })
  }

  /// Restore every file of an operation from its backup.
  ///
  /// Works across processes: the backup manifest on disk is authoritative,
  /// not the in-memory operation table.
  pub fn rollback_operation(&mut self, operation_id: &str) -> WardenResult<Vec<PathBuf>> {
    let manifest_path = self.backup_dir(operation_id).join("manifest.json");
    if !manifest_path.exists() {
      if self.operations.contains_key(operation_id) {
        return Err(WardenError::Safety(SafetyError::NoBackup {
          operation_id: operation_id.to_string(),
        }));
      }
      return Err(WardenError::Validation(ValidationError::OperationNotFound {
        operation_id: operation_id.to_string(),
      }));
    }

    let restored = self.restore_backup(operation_id)?;
    self.set_state(operation_id, OperationState::RolledBack);
    self.audit(operation_id, "rolled_back", &restored)?;
    Ok(restored)
  }

  fn set_state(&mut self, operation_id: &str, state: OperationState) {
    if let Some(op) = self.operations.get_mut(operation_id) {
      op.state = state;
    }
  }

  fn backup_dir(&self, operation_id: &str) -> PathBuf {
    self.workdir.join("backups").join(operation_id)
  }

  /// Snapshot every target file under the backup directory and write the
  /// manifest. The manifest records files that do not yet exist so rollback
  /// can delete them.
  fn create_backup(&self, operation: &Operation) -> WardenResult<()> {
    let dir = self.backup_dir(&operation.id);
    fs::create_dir_all(&dir)?;

    let mut entries = Vec::new();
    for file in &operation.files {
      let source = self.project_root.join(file);
      let existed = source.exists();
      if existed {
        let target = dir.join(file);
        if let Some(parent) = target.parent() {
          fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &target)?;
      }
      entries.push(BackupEntry {
        path: file.clone(),
        existed,
      });
    }

    let manifest = BackupManifest {
      operation_id: operation.id.clone(),
      description: operation.description.clone(),
      created_at: operation.started_at,
      files: entries,
    };
    fs::write(dir.join("manifest.json"), serde_json::to_string_pretty(&manifest)?)?;
    Ok(())
  }

  fn restore_backup(&self, operation_id: &str) -> WardenResult<Vec<PathBuf>> {
    let dir = self.backup_dir(operation_id);
    let raw = fs::read_to_string(dir.join("manifest.json"))?;
    let manifest: BackupManifest = serde_json::from_str(&raw)?;

    let mut restored = Vec::new();
    for entry in &manifest.files {
      let live = self.project_root.join(&entry.path);
      let result = if entry.existed {
        let backup = dir.join(&entry.path);
        if let Some(parent) = live.parent() {
          fs::create_dir_all(parent).and_then(|_| fs::copy(&backup, &live).map(|_| ()))
        } else {
          fs::copy(&backup, &live).map(|_| ())
        }
      } else if live.exists() {
        fs::remove_file(&live)
      } else {
        Ok(())
      };

      if let Err(err) = result {
        return Err(WardenError::Safety(SafetyError::RollbackFailed {
          operation_id: operation_id.to_string(),
          path: entry.path.clone(),
          detail: err.to_string(),
        }));
      }
      restored.push(entry.path.clone());
    }
    Ok(restored)
  }

  /// Roll back after a mid-apply failure and produce the error to surface.
  /// A rollback failure here takes precedence over the original reason.
  fn fail_and_rollback(&mut self, operation_id: &str, reason: String) -> WardenError {
    if let Err(rollback_err) = self.restore_backup(operation_id) {
      return rollback_err;
    }
    self.set_state(operation_id, OperationState::RolledBack);
    let paths = self
      .operations
      .get(operation_id)
      .map(|op| op.files.clone())
      .unwrap_or_default();
    let _ = self.audit(operation_id, "failed", &paths);
    WardenError::Safety(SafetyError::RolledBack {
      operation_id: operation_id.to_string(),
      reason,
    })
  }

  fn write_change(&self, change: &FileChange) -> WardenResult<()> {
    let live = self.project_root.join(&change.path);
    match change.kind {
      ChangeKind::Create | ChangeKind::Modify => {
        if let Some(parent) = live.parent() {
          fs::create_dir_all(parent)?;
        }
        fs::write(&live, change.new.as_deref().unwrap_or(""))?;
      }
      ChangeKind::Delete => {
        fs::remove_file(&live)?;
      }
    }
    Ok(())
  }

  /// Append one NDJSON line to the audit log
  fn audit(&self, operation_id: &str, outcome: &str, paths: &[PathBuf]) -> WardenResult<()> {
    let log_dir = self.workdir.join("logs");
    fs::create_dir_all(&log_dir)?;

    let entry = AuditEntry {
      operation_id,
      timestamp: Utc::now(),
      outcome,
      files: paths.len(),
      paths,
    };
    let mut line = serde_json::to_string(&entry)?;
    line.push('\n');

    use std::io::Write;
    let mut file = fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(log_dir.join("audit.log"))?;
    file.write_all(line.as_bytes())?;
    Ok(())
  }
}

/// Short stable id for an operation
fn derive_operation_id(description: &str, files: &[PathBuf]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(description.as_bytes());
  for file in files {
    hasher.update(file.to_string_lossy().as_bytes());
  }
  hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
  format!("{:x}", hasher.finalize())[..12].to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::safety::test_gate::StaticGate;
  use tempfile::TempDir;

  fn manager(root: &Path) -> SafetyManager {
    SafetyManager::new(root, &WardenConfig::default()).with_gate(Box::new(StaticGate::passing()))
  }

  #[test]
  fn test_validation_has_no_side_effects() {
    let temp = TempDir::new().unwrap();
    let mut mgr = manager(temp.path());

    let files: Vec<PathBuf> = (0..60).map(|i| PathBuf::from(format!("f{i}.ts"))).collect();
    let err = mgr.start_operation("too big", &files).unwrap_err();
    assert!(matches!(
      err,
      WardenError::Validation(ValidationError::TooManyFiles { requested: 60, max_files: 50 })
    ));
    // Nothing written before validation passed
    assert!(!temp.path().join(".warden").exists());
  }

  #[test]
  fn test_backup_written_before_gate() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "original").unwrap();
    let mut mgr = SafetyManager::new(temp.path(), &WardenConfig::default()).with_gate(Box::new(StaticGate::failing()));

    let err = mgr.start_operation("blocked", &[PathBuf::from("a.ts")]).unwrap_err();
    let WardenError::Safety(SafetyError::GateBlocked { operation_id, .. }) = err else {
      panic!("expected GateBlocked");
    };

    // Backup and manifest exist even though the gate refused the operation
    let backup = temp.path().join(".warden/backups").join(&operation_id);
    assert!(backup.join("manifest.json").exists());
    assert_eq!(std::fs::read_to_string(backup.join("a.ts")).unwrap(), "original");
  }

  #[test]
  fn test_dry_run_touches_nothing() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "before").unwrap();
    let mut mgr = manager(temp.path());

    let start = mgr.start_operation("fix", &[PathBuf::from("a.ts")]).unwrap();
    let report = mgr
      .apply_changes(
        &start.operation_id,
        &[FileChange::modify("a.ts", "before", "after")],
        false,
      )
      .unwrap();

    assert!(!report.applied);
    assert!(report.preview.contains("-before"));
    assert!(report.preview.contains("+after"));
    assert_eq!(std::fs::read_to_string(temp.path().join("a.ts")).unwrap(), "before");
  }

  #[test]
  fn test_apply_commits_and_audits() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "before").unwrap();
    let mut mgr = manager(temp.path());

    let start = mgr.start_operation("fix", &[PathBuf::from("a.ts")]).unwrap();
    let report = mgr
      .apply_changes(&start.operation_id, &[FileChange::modify("a.ts", "before", "after")], true)
      .unwrap();

    assert!(report.applied);
    assert_eq!(std::fs::read_to_string(temp.path().join("a.ts")).unwrap(), "after");
    assert_eq!(mgr.operation(&start.operation_id).unwrap().state, OperationState::Committed);

    let audit = std::fs::read_to_string(temp.path().join(".warden/logs/audit.log")).unwrap();
    let outcomes: Vec<String> = audit
      .lines()
      .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["outcome"].as_str().unwrap().to_string())
      .collect();
    assert_eq!(outcomes, vec!["started", "committed"]);
  }

  #[test]
  fn test_post_apply_gate_failure_rolls_back() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "before").unwrap();

    // Pre-gate passes, post-gate fails: both run through the same gate, so
    // use one that passes once then fails.
    struct FlakyGate(std::sync::atomic::AtomicUsize);
    impl Gate for FlakyGate {
      fn run(&self, _root: &Path) -> WardenResult<GateOutcome> {
        let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n == 0 {
          Ok(GateOutcome::Passed {
            command: "flaky".to_string(),
          })
        } else {
          Ok(GateOutcome::Failed {
            command: "flaky".to_string(),
            detail: "regression".to_string(),
          })
        }
      }
    }

    let mut mgr = SafetyManager::new(temp.path(), &WardenConfig::default())
      .with_gate(Box::new(FlakyGate(std::sync::atomic::AtomicUsize::new(0))));

    let start = mgr.start_operation("fix", &[PathBuf::from("a.ts")]).unwrap();
    let err = mgr
      .apply_changes(&start.operation_id, &[FileChange::modify("a.ts", "before", "after")], true)
      .unwrap_err();

    assert!(matches!(err, WardenError::Safety(SafetyError::RolledBack { .. })));
    // Disk restored to the pre-operation content
    assert_eq!(std::fs::read_to_string(temp.path().join("a.ts")).unwrap(), "before");
    assert_eq!(mgr.operation(&start.operation_id).unwrap().state, OperationState::RolledBack);

    let audit = std::fs::read_to_string(temp.path().join(".warden/logs/audit.log")).unwrap();
    assert!(audit.lines().any(|l| l.contains("\"failed\"")));
  }

  #[test]
  fn test_rollback_restores_and_removes_created() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "original a").unwrap();
    let mut mgr = manager(temp.path());

    let files = vec![PathBuf::from("a.ts"), PathBuf::from("new.ts")];
    let start = mgr.start_operation("refactor", &files).unwrap();
    mgr
      .apply_changes(
        &start.operation_id,
        &[
          FileChange::modify("a.ts", "original a", "changed a"),
          FileChange::create("new.ts", "brand new"),
        ],
        true,
      )
      .unwrap();

    let restored = mgr.rollback_operation(&start.operation_id).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(std::fs::read_to_string(temp.path().join("a.ts")).unwrap(), "original a");
    // Created during the operation, so rollback removes it
    assert!(!temp.path().join("new.ts").exists());
  }

  #[test]
  fn test_rollback_unknown_operation() {
    let temp = TempDir::new().unwrap();
    let mut mgr = manager(temp.path());
    let err = mgr.rollback_operation("nonexistent12").unwrap_err();
    assert!(matches!(
      err,
      WardenError::Validation(ValidationError::OperationNotFound { .. })
    ));
  }

  #[test]
  fn test_empty_change_set_rejected() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "x").unwrap();
    let mut mgr = manager(temp.path());
    let start = mgr.start_operation("noop", &[PathBuf::from("a.ts")]).unwrap();
    let err = mgr.apply_changes(&start.operation_id, &[], true).unwrap_err();
    assert!(matches!(err, WardenError::Validation(ValidationError::NothingToDo { .. })));
  }

  #[test]
  fn test_critical_file_warning() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("package.json"), "{}").unwrap();
    let mut mgr = manager(temp.path());
    let start = mgr
      .start_operation("bump", &[PathBuf::from("package.json")])
      .unwrap();
    assert_eq!(start.warnings.len(), 1);
    assert!(start.warnings[0].contains("package.json"));
  }
}
