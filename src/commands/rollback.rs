//! Rollback command
//!
//! Restores an operation's files from its backup. Works in a fresh process:
//! the on-disk manifest is the source of truth.

use crate::core::config::WardenConfig;
use crate::core::error::WardenResult;
use crate::safety::manager::SafetyManager;
use std::path::Path;

pub fn run_rollback(root: &Path, operation_id: &str) -> WardenResult<()> {
  let config = WardenConfig::load(root)?;
  let mut manager = SafetyManager::new(root, &config);

  let restored = manager.rollback_operation(operation_id)?;

  println!("✅ Rolled back operation {}", operation_id);
  for path in &restored {
    println!("   restored {}", path.display());
  }
  Ok(())
}
