//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway project tree for the CLI to analyze
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestProject {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    Ok(Self { _root: root, path })
  }

  /// Write a file, creating parent directories
  pub fn write(&self, rel: &str, content: &str) -> Result<()> {
    let path = self.path.join(rel);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
  }

  pub fn read(&self, rel: &str) -> Result<String> {
    std::fs::read_to_string(self.path.join(rel)).with_context(|| format!("Failed to read {}", rel))
  }
}

/// Run warden and require success
pub fn run_warden(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = spawn_warden(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "warden command failed: warden {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run warden without asserting on the exit status
pub fn spawn_warden(cwd: &Path, args: &[&str]) -> Result<Output> {
  let warden_bin = env!("CARGO_BIN_EXE_warden");

  Command::new(warden_bin)
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run warden")
}

pub fn stdout_of(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_of(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
