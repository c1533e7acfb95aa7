//! Configuration for warden
//! Searched in order: warden.yml, warden.yaml, .warden.yml, .config/warden.yml

use crate::core::error::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Candidate config file names, tried in order from the project root
const CONFIG_CANDIDATES: &[&str] = &["warden.yml", "warden.yaml", ".warden.yml", ".config/warden.yml"];

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WardenConfig {
  #[serde(default)]
  pub scan: ScanConfig,
  #[serde(default)]
  pub analyzers: AnalyzersConfig,
  #[serde(default)]
  pub safety: SafetyConfig,
}

/// File scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
  /// Glob patterns for files to include
  #[serde(default = "default_include")]
  pub include: Vec<String>,

  /// Glob patterns for files to exclude
  #[serde(default)]
  pub exclude: Vec<String>,

  /// Directory names skipped entirely during the walk
  #[serde(default = "default_skip_dirs")]
  pub skip_dirs: Vec<String>,

  /// Files larger than this are skipped (bytes)
  #[serde(default = "default_max_file_size")]
  pub max_file_size: u64,
}

fn default_include() -> Vec<String> {
  ["**/*.ts", "**/*.tsx", "**/*.js", "**/*.jsx", "**/*.mjs", "**/*.cjs"]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_dirs() -> Vec<String> {
  ["node_modules", ".git", "target", "dist", "build", "coverage", ".warden"]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_file_size() -> u64 {
  1024 * 1024
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      include: default_include(),
      exclude: Vec::new(),
      skip_dirs: default_skip_dirs(),
      max_file_size: default_max_file_size(),
    }
  }
}

/// Per-analyzer rule sections
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyzersConfig {
  #[serde(default)]
  pub complexity: ComplexityRules,
  #[serde(default)]
  pub naming: NamingRules,
  #[serde(default)]
  pub sql: SqlRules,
  #[serde(default)]
  pub security: SecurityRules,
  #[serde(default)]
  pub tests: TestRules,
}

/// Complexity thresholds. The complexity analyzer itself always runs; only
/// its limits are tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityRules {
  /// Files longer than this are flagged
  #[serde(default = "default_max_file_lines")]
  pub max_file_lines: usize,

  /// Lines longer than this are flagged
  #[serde(default = "default_max_line_length")]
  pub max_line_length: usize,

  /// Indentation depth (levels) beyond which nesting is flagged
  #[serde(default = "default_max_nesting")]
  pub max_nesting: usize,
}

fn default_true() -> bool {
  true
}

fn default_max_file_lines() -> usize {
  500
}

fn default_max_line_length() -> usize {
  120
}

fn default_max_nesting() -> usize {
  5
}

impl Default for ComplexityRules {
  fn default() -> Self {
    Self {
      max_file_lines: default_max_file_lines(),
      max_line_length: default_max_line_length(),
      max_nesting: default_max_nesting(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingRules {
  #[serde(default = "default_true")]
  pub enabled: bool,

  /// Expected identifier style: "camelCase" or "snake_case"
  #[serde(default = "default_naming_style")]
  pub style: String,
}

fn default_naming_style() -> String {
  "camelCase".to_string()
}

impl Default for NamingRules {
  fn default() -> Self {
    Self {
      enabled: true,
      style: default_naming_style(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlRules {
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for SqlRules {
  fn default() -> Self {
    Self { enabled: true }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRules {
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for SecurityRules {
  fn default() -> Self {
    Self { enabled: true }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRules {
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for TestRules {
  fn default() -> Self {
    Self { enabled: true }
  }
}

/// Safety layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
  /// Working directory for backups and the audit log, relative to the
  /// project root unless absolute
  #[serde(default = "default_workdir")]
  pub workdir: PathBuf,

  /// Maximum files a single operation may touch
  #[serde(default = "default_max_files")]
  pub max_files: usize,

  /// Test gate timeout in seconds
  #[serde(default = "default_test_timeout_secs")]
  pub test_timeout_secs: u64,
}

fn default_workdir() -> PathBuf {
  PathBuf::from(".warden")
}

fn default_max_files() -> usize {
  50
}

fn default_test_timeout_secs() -> u64 {
  300
}

impl Default for SafetyConfig {
  fn default() -> Self {
    Self {
      workdir: default_workdir(),
      max_files: default_max_files(),
      test_timeout_secs: default_test_timeout_secs(),
    }
  }
}

impl WardenConfig {
  /// Load configuration from the project root.
  ///
  /// Missing config file yields defaults; a present but malformed file is an
  /// error. Silently ignoring a broken config would mask user intent.
  pub fn load(project_root: &Path) -> WardenResult<Self> {
    for candidate in CONFIG_CANDIDATES {
      let path = project_root.join(candidate);
      if path.exists() {
        let raw = fs::read_to_string(&path)?;
        let config: WardenConfig = serde_yaml::from_str(&raw)
          .map_err(|e| WardenError::message(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        return Ok(config);
      }
    }
    Ok(WardenConfig::default())
  }

  /// Validate configuration values
  pub fn validate(&self) -> WardenResult<()> {
    if self.safety.max_files == 0 {
      return Err(WardenError::message("safety.max_files must be at least 1"));
    }
    if self.safety.test_timeout_secs == 0 {
      return Err(WardenError::message("safety.test_timeout_secs must be at least 1"));
    }
    match self.analyzers.naming.style.as_str() {
      "camelCase" | "snake_case" => {}
      other => {
        return Err(WardenError::message(format!(
          "Invalid naming style '{}'. Must be 'camelCase' or 'snake_case'",
          other
        )));
      }
    }
    Ok(())
  }

  /// Resolve the safety workdir against the project root
  pub fn workdir(&self, project_root: &Path) -> PathBuf {
    if self.safety.workdir.is_absolute() {
      self.safety.workdir.clone()
    } else {
      project_root.join(&self.safety.workdir)
    }
  }
}
