//! Integration tests for `warden rollback`

use crate::helpers::{TestProject, run_warden, spawn_warden, stderr_of, stdout_of};
use anyhow::Result;

#[test]
fn test_rollback_unknown_operation() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", "export const x = 1;\n")?;

  let output = spawn_warden(&project.path, &["rollback", "deadbeef0000"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr_of(&output).contains("Unknown operation"));
  Ok(())
}

#[test]
fn test_rollback_is_idempotent() -> Result<()> {
  let project = TestProject::new()?;
  let dirty = "const x = 1;   \n";
  project.write("src/app.ts", dirty)?;

  run_warden(&project.path, &["fix", "--apply", "--no-verify"])?;
  let operation_id = std::fs::read_dir(project.path.join(".warden/backups"))?
    .next()
    .unwrap()?
    .file_name()
    .to_string_lossy()
    .to_string();

  // Rolling back twice leaves the same restored state
  run_warden(&project.path, &["rollback", &operation_id])?;
  let output = run_warden(&project.path, &["rollback", &operation_id])?;
  assert!(stdout_of(&output).contains("Rolled back operation"));
  assert_eq!(project.read("src/app.ts")?, dirty);
  Ok(())
}
