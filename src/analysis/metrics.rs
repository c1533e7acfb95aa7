//! Project metrics and the derived tech-debt score
//!
//! Metrics are always computed from the full pre-filter issue set; the
//! severity threshold only affects the reported issue list.

use crate::analysis::analyzers::TestCoverageAnalyzer;
use crate::analysis::issue::{Issue, Severity};
use crate::core::error::WardenResult;
use crate::core::files::FileRecord;
use crate::graph::ImportGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Tech-debt score weights. The four terms sum to 100, so the score lands on
// a 0-100 scale. Tunable.
const WEIGHT_ISSUE_DENSITY: f64 = 30.0;
const WEIGHT_REMEDIATION: f64 = 40.0;
const WEIGHT_COVERAGE_GAP: f64 = 20.0;
const WEIGHT_DUPLICATION: f64 = 10.0;

// Estimated remediation hours per issue severity
const HOURS_LOW: f64 = 0.25;
const HOURS_MEDIUM: f64 = 1.0;
const HOURS_HIGH: f64 = 2.0;
const HOURS_CRITICAL: f64 = 4.0;

// Remediation multipliers for issue types that cost more than their
// severity alone suggests
const MULTIPLIER_SECURITY: f64 = 1.5;
const MULTIPLIER_DEPENDENCY: f64 = 1.25;
const MULTIPLIER_DEFAULT: f64 = 1.0;

// Saturation points: values at or beyond these max out their term
const ISSUE_DENSITY_SATURATION: f64 = 5.0;
const REMEDIATION_SATURATION_HOURS: f64 = 80.0;

// Duplicate detection ignores short lines (braces, blank-ish lines)
const DUPLICATE_MIN_LINE_LEN: usize = 12;

/// Aggregated project metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetrics {
  pub files_analyzed: usize,
  pub total_lines: usize,
  pub avg_file_lines: f64,
  pub max_file_lines: usize,
  /// Resolved internal import edges
  pub internal_dependencies: usize,
  /// External package references
  pub external_dependencies: usize,
  /// Test files / source files
  pub test_coverage_ratio: f64,
  /// Share of substantive lines that are duplicates (0-1)
  pub duplicate_line_ratio: f64,
  /// Severity/type-weighted remediation estimate
  pub remediation_hours: f64,
  /// Derived 0-100 composite
  pub tech_debt_score: f64,
}

impl ProjectMetrics {
  /// Compute metrics over the full file set and the unfiltered issue list
  pub fn compute(files: &[FileRecord], issues: &[Issue]) -> WardenResult<Self> {
    let mut total_lines = 0usize;
    let mut max_file_lines = 0usize;
    let mut line_counts = HashMap::new();
    let mut substantive = 0usize;
    let mut duplicates = 0usize;

    for file in files {
      let content = file.read().unwrap_or_default();
      let lines = content.lines().count();
      total_lines += lines;
      max_file_lines = max_file_lines.max(lines);

      for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.len() < DUPLICATE_MIN_LINE_LEN {
          continue;
        }
        substantive += 1;
        let seen = line_counts.entry(trimmed.to_string()).or_insert(0usize);
        *seen += 1;
        if *seen > 1 {
          duplicates += 1;
        }
      }
    }

    let graph = ImportGraph::build(files)?;

    let test_files = files.iter().filter(|f| TestCoverageAnalyzer::is_test_file(f)).count();
    let source_files = files.len().saturating_sub(test_files);
    let test_coverage_ratio = if source_files == 0 {
      1.0
    } else {
      (test_files as f64 / source_files as f64).min(1.0)
    };

    let duplicate_line_ratio = if substantive == 0 {
      0.0
    } else {
      duplicates as f64 / substantive as f64
    };

    let remediation_hours = issues.iter().map(remediation_estimate).sum::<f64>();

    let avg_file_lines = if files.is_empty() {
      0.0
    } else {
      total_lines as f64 / files.len() as f64
    };

    let mut metrics = Self {
      files_analyzed: files.len(),
      total_lines,
      avg_file_lines,
      max_file_lines,
      internal_dependencies: graph.edge_count(),
      external_dependencies: graph.external_count(),
      test_coverage_ratio,
      duplicate_line_ratio,
      remediation_hours,
      tech_debt_score: 0.0,
    };
    metrics.tech_debt_score = metrics.debt_score(issues.len());
    Ok(metrics)
  }

  fn debt_score(&self, issue_count: usize) -> f64 {
    let density = if self.files_analyzed == 0 {
      0.0
    } else {
      issue_count as f64 / self.files_analyzed as f64
    };

    let density_term = (density / ISSUE_DENSITY_SATURATION).min(1.0);
    let remediation_term = (self.remediation_hours / REMEDIATION_SATURATION_HOURS).min(1.0);
    let coverage_gap = (1.0 - self.test_coverage_ratio).clamp(0.0, 1.0);
    let duplication = self.duplicate_line_ratio.clamp(0.0, 1.0);

    let score = WEIGHT_ISSUE_DENSITY * density_term
      + WEIGHT_REMEDIATION * remediation_term
      + WEIGHT_COVERAGE_GAP * coverage_gap
      + WEIGHT_DUPLICATION * duplication;

    score.clamp(0.0, 100.0)
  }
}

/// Hours to remediate one issue, weighted by severity and type
fn remediation_estimate(issue: &Issue) -> f64 {
  let base = match issue.severity {
    Severity::Low => HOURS_LOW,
    Severity::Medium => HOURS_MEDIUM,
    Severity::High => HOURS_HIGH,
    Severity::Critical => HOURS_CRITICAL,
  };
  let multiplier = match issue.category.as_str() {
    "security" => MULTIPLIER_SECURITY,
    "dependency" => MULTIPLIER_DEPENDENCY,
    _ => MULTIPLIER_DEFAULT,
  };
  base * multiplier
}
