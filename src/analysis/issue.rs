//! Analyzer findings: `Issue` and the four ordered severity levels.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Issue severity. Exactly four ordered levels; threshold filtering is
/// monotonic in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  /// Numeric rank: low=1 .. critical=4
  pub fn rank(self) -> u8 {
    match self {
      Severity::Low => 1,
      Severity::Medium => 2,
      Severity::High => 3,
      Severity::Critical => 4,
    }
  }

  /// Parse a CLI threshold string
  pub fn parse(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "low" => Some(Severity::Low),
      "medium" => Some(Severity::Medium),
      "high" => Some(Severity::High),
      "critical" => Some(Severity::Critical),
      _ => None,
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Low => write!(f, "low"),
      Severity::Medium => write!(f, "medium"),
      Severity::High => write!(f, "high"),
      Severity::Critical => write!(f, "critical"),
    }
  }
}

/// A single analyzer finding. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
  /// Stable short id derived from the issue's identity fields
  pub id: String,
  /// Machine-readable issue type (kebab-case, e.g. "circular-dependency")
  pub issue_type: String,
  pub severity: Severity,
  /// Analyzer category that produced this issue
  pub category: String,
  pub title: String,
  pub description: String,
  pub file: PathBuf,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub line: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub column: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub suggestion: Option<String>,
  pub auto_fixable: bool,
}

impl Issue {
  /// Create an issue with a deterministic id
  pub fn new(
    issue_type: impl Into<String>,
    severity: Severity,
    category: impl Into<String>,
    title: impl Into<String>,
    description: impl Into<String>,
    file: impl Into<PathBuf>,
  ) -> Self {
    let issue_type = issue_type.into();
    let category = category.into();
    let title = title.into();
    let file = file.into();

    let mut issue = Self {
      id: String::new(),
      issue_type,
      severity,
      category,
      title,
      description: description.into(),
      file,
      line: None,
      column: None,
      suggestion: None,
      auto_fixable: false,
    };
    issue.id = issue.derive_id();
    issue
  }

  /// Attach a line number (re-derives the id: same finding on a different
  /// line is a different issue)
  pub fn at_line(mut self, line: usize) -> Self {
    self.line = Some(line);
    self.id = self.derive_id();
    self
  }

  /// Attach a column number
  pub fn at_column(mut self, column: usize) -> Self {
    self.column = Some(column);
    self
  }

  /// Attach a suggested fix
  pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
    self.suggestion = Some(suggestion.into());
    self
  }

  /// Mark as auto-fixable
  pub fn fixable(mut self) -> Self {
    self.auto_fixable = true;
    self
  }

  fn derive_id(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.issue_type.as_bytes());
    hasher.update(self.file.to_string_lossy().as_bytes());
    hasher.update(self.title.as_bytes());
    hasher.update(self.line.unwrap_or(0).to_le_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..12].to_string()
  }
}

/// Filter issues by severity threshold: keeps issues with
/// `rank(severity) >= rank(threshold)`. Monotonic: raising the threshold
/// never adds issues.
pub fn filter_by_threshold(issues: &[Issue], threshold: Severity) -> Vec<Issue> {
  issues
    .iter()
    .filter(|i| i.severity.rank() >= threshold.rank())
    .cloned()
    .collect()
}
