//! Integration tests for `warden fix` and its safety protocol

use crate::helpers::{TestProject, run_warden, spawn_warden, stderr_of, stdout_of};
use anyhow::Result;

const DIRTY: &str = "const x = 1;   \nexport const y = 2;\n";
const CLEAN: &str = "const x = 1;\nexport const y = 2;\n";

/// The single backup directory created by an operation
fn only_operation_id(project: &TestProject) -> Result<String> {
  let backups = project.path.join(".warden/backups");
  let mut entries: Vec<String> = std::fs::read_dir(backups)?
    .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
    .collect();
  assert_eq!(entries.len(), 1);
  Ok(entries.remove(0))
}

#[test]
fn test_dry_run_previews_without_touching_disk() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", DIRTY)?;

  let output = run_warden(&project.path, &["fix"])?;
  let stdout = stdout_of(&output);

  assert!(stdout.contains("-const x = 1;   "));
  assert!(stdout.contains("+const x = 1;"));
  assert!(stdout.contains("Dry run"));

  // File untouched, no workdir created
  assert_eq!(project.read("src/app.ts")?, DIRTY);
  assert!(!project.path.join(".warden").exists());
  Ok(())
}

#[test]
fn test_apply_then_rollback_round_trip() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", DIRTY)?;

  run_warden(&project.path, &["fix", "--apply", "--no-verify"])?;
  assert_eq!(project.read("src/app.ts")?, CLEAN);

  let operation_id = only_operation_id(&project)?;

  // Backup holds the pre-fix bytes
  let backed_up = project.read(&format!(".warden/backups/{}/src/app.ts", operation_id))?;
  assert_eq!(backed_up, DIRTY);

  // Rollback restores the original content exactly
  run_warden(&project.path, &["rollback", &operation_id])?;
  assert_eq!(project.read("src/app.ts")?, DIRTY);
  Ok(())
}

#[test]
fn test_apply_writes_audit_trail() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", DIRTY)?;

  run_warden(&project.path, &["fix", "--apply", "--no-verify"])?;

  let audit = project.read(".warden/logs/audit.log")?;
  let outcomes: Vec<String> = audit
    .lines()
    .map(|line| {
      let entry: serde_json::Value = serde_json::from_str(line).expect("audit lines are JSON");
      entry["outcome"].as_str().unwrap().to_string()
    })
    .collect();
  assert_eq!(outcomes, vec!["started", "committed"]);
  Ok(())
}

#[test]
fn test_max_files_refused_before_any_side_effect() -> Result<()> {
  let project = TestProject::new()?;
  project.write("warden.yml", "safety:\n  max_files: 1\n")?;
  project.write("src/a.ts", "const a = 1;   \n")?;
  project.write("src/b.ts", "const b = 2;   \n")?;

  let output = spawn_warden(&project.path, &["fix", "--apply", "--no-verify"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("exceeding the limit of 1"));

  // Validation refused the operation before backups or logs were written
  assert!(!project.path.join(".warden").exists());
  assert_eq!(project.read("src/a.ts")?, "const a = 1;   \n");
  Ok(())
}

#[test]
fn test_nothing_to_fix() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", CLEAN)?;

  let output = run_warden(&project.path, &["fix"])?;
  assert!(stdout_of(&output).contains("No auto-fixable issues"));
  Ok(())
}

#[test]
fn test_apply_proceeds_when_project_has_no_suite() -> Result<()> {
  // Real gate, no --no-verify: a JS project without a test script must not
  // be blocked by some other ecosystem's runner being installed
  let project = TestProject::new()?;
  project.write("package.json", r#"{"name":"app","version":"1.0.0"}"#)?;
  project.write("src/app.ts", DIRTY)?;

  run_warden(&project.path, &["fix", "--apply"])?;
  assert_eq!(project.read("src/app.ts")?, CLEAN);

  let audit = project.read(".warden/logs/audit.log")?;
  assert!(audit.lines().any(|line| line.contains("\"committed\"")));
  Ok(())
}

#[test]
fn test_apply_blocked_by_failing_suite() -> Result<()> {
  // A present-and-failing suite must refuse the operation before any write
  let project = TestProject::new()?;
  project.write(
    "Cargo.toml",
    "[package]\nname = \"gate-target\"\nversion = \"0.0.0\"\nedition = \"2021\"\n",
  )?;
  project.write("src/lib.rs", "#[test]\nfn always_fails() {\n  assert_eq!(1, 2);\n}\n")?;
  project.write("src/app.ts", DIRTY)?;

  let output = spawn_warden(&project.path, &["fix", "--apply"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr_of(&output).contains("blocked by test gate"));

  // Target untouched, outcome recorded
  assert_eq!(project.read("src/app.ts")?, DIRTY);
  let audit = project.read(".warden/logs/audit.log")?;
  assert!(audit.lines().any(|line| line.contains("\"blocked\"")));
  Ok(())
}

#[test]
fn test_manifest_records_operation() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", DIRTY)?;

  run_warden(&project.path, &["fix", "--apply", "--no-verify"])?;
  let operation_id = only_operation_id(&project)?;

  let manifest = project.read(&format!(".warden/backups/{}/manifest.json", operation_id))?;
  let manifest: serde_json::Value = serde_json::from_str(&manifest)?;
  assert_eq!(manifest["operation_id"], operation_id.as_str());
  assert_eq!(manifest["files"][0]["path"], "src/app.ts");
  assert_eq!(manifest["files"][0]["existed"], true);
  Ok(())
}
