//! Analyzer trait abstraction
//!
//! All analyzers implement the `Analyzer` trait, making it easy to add new
//! ones without touching engine logic. Analyzers are stateless, receive an
//! immutable batch of file records plus the rule config, and produce Issues.

use crate::analysis::issue::Issue;
use crate::core::config::WardenConfig;
use crate::core::error::WardenResult;
use crate::core::files::FileRecord;

/// A pluggable analyzer
///
/// `analyze` iterates every file in the batch it is handed; the engine
/// controls batch size and task-level concurrency, not the analyzer.
pub trait Analyzer: Send + Sync {
  /// Unique name for this analyzer (kebab-case)
  fn name(&self) -> &str;

  /// Human-readable description of what this analyzer finds
  fn description(&self) -> &str;

  /// Run the analyzer over a batch of files
  fn analyze(&self, files: &[FileRecord], config: &WardenConfig) -> WardenResult<Vec<Issue>>;

  /// Optional analyzer-specific metrics over the full file set
  fn calculate_metrics(&self, _files: &[FileRecord]) -> Option<serde_json::Value> {
    None
  }
}
