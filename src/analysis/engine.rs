//! Analysis orchestration
//!
//! The engine owns analyzer selection, file batching, and task-level
//! concurrency. Analyzers see one batch at a time; an analyzer error aborts
//! the whole run (partial analysis results would be misleading), unlike the
//! bulk executor's per-item isolation.

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzers::{
  ComplexityAnalyzer, DependencyAnalyzer, NamingAnalyzer, SecurityAnalyzer, SqlAnalyzer, TestCoverageAnalyzer,
};
use crate::analysis::issue::{Issue, Severity, filter_by_threshold};
use crate::analysis::metrics::ProjectMetrics;
use crate::core::config::{AnalyzersConfig, WardenConfig};
use crate::core::error::{WardenError, WardenResult};
use crate::core::files::FileRecord;
use crate::ui::progress::{ProgressSnapshot, ProgressTracker};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Files per analysis batch
const DEFAULT_BATCH_SIZE: usize = 100;

/// Analyzers running in parallel per batch
const DEFAULT_TASK_CONCURRENCY: usize = 3;

/// Invoke the memory-pressure hint every this many batches
const MEMORY_HINT_INTERVAL: usize = 5;

/// A registered analyzer plus its activation rule.
///
/// The core pair runs unconditionally on every pass; the rest only in
/// comprehensive mode, and only when their config section is enabled.
struct AnalyzerSpec {
  core: bool,
  enabled: fn(&AnalyzersConfig) -> bool,
  analyzer: Arc<dyn Analyzer>,
}

fn registry() -> Vec<AnalyzerSpec> {
  vec![
    AnalyzerSpec {
      core: true,
      enabled: |_| true,
      analyzer: Arc::new(ComplexityAnalyzer),
    },
    AnalyzerSpec {
      core: true,
      enabled: |_| true,
      analyzer: Arc::new(DependencyAnalyzer),
    },
    AnalyzerSpec {
      core: false,
      enabled: |a| a.naming.enabled,
      analyzer: Arc::new(NamingAnalyzer),
    },
    AnalyzerSpec {
      core: false,
      enabled: |a| a.sql.enabled,
      analyzer: Arc::new(SqlAnalyzer),
    },
    AnalyzerSpec {
      core: false,
      enabled: |a| a.security.enabled,
      analyzer: Arc::new(SecurityAnalyzer),
    },
    AnalyzerSpec {
      core: false,
      enabled: |a| a.tests.enabled,
      analyzer: Arc::new(TestCoverageAnalyzer),
    },
  ]
}

/// Options for one analysis run
pub struct EngineOptions<'a> {
  /// Run the full analyzer set, not just the core pass
  pub comprehensive: bool,

  /// Minimum severity to report
  pub threshold: Severity,

  /// Files per batch
  pub batch_size: usize,

  /// Analyzers in flight per batch
  pub task_concurrency: usize,

  /// Throttled progress callback
  pub progress: Option<&'a (dyn Fn(&ProgressSnapshot) + Sync)>,

  /// Best-effort memory-reclaim hint, invoked every few batches
  pub memory_pressure: Option<&'a (dyn Fn() + Sync)>,
}

impl Default for EngineOptions<'_> {
  fn default() -> Self {
    Self {
      comprehensive: false,
      threshold: Severity::Low,
      batch_size: DEFAULT_BATCH_SIZE,
      task_concurrency: DEFAULT_TASK_CONCURRENCY,
      progress: None,
      memory_pressure: None,
    }
  }
}

/// Issue counts broken down for the report footer
#[derive(Debug, Clone, Serialize, Default)]
pub struct AnalysisSummary {
  pub files_analyzed: usize,
  /// Findings across all analyzers before threshold filtering
  pub total_issues: usize,
  /// Findings at or above the threshold
  pub reported_issues: usize,
  pub auto_fixable: usize,
  pub by_severity: BTreeMap<String, usize>,
  pub by_category: BTreeMap<String, usize>,
}

/// Outcome of a full analysis run
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
  /// Issues at or above the requested threshold, ordered by severity
  /// (descending) then file then line
  pub issues: Vec<Issue>,
  pub metrics: ProjectMetrics,
  /// Per-analyzer metric blobs, keyed by analyzer name
  pub analyzer_metrics: BTreeMap<String, serde_json::Value>,
  pub summary: AnalysisSummary,
  #[serde(skip)]
  pub duration: Duration,
}

/// Runs selected analyzers over batched files.
pub struct AnalysisEngine {
  config: WardenConfig,
}

impl AnalysisEngine {
  pub fn new(config: WardenConfig) -> Self {
    Self { config }
  }

  /// Names of the analyzers a run with these options would execute
  pub fn selected_names(&self, comprehensive: bool) -> Vec<String> {
    self
      .select(comprehensive)
      .iter()
      .map(|a| a.name().to_string())
      .collect()
  }

  fn select(&self, comprehensive: bool) -> Vec<Arc<dyn Analyzer>> {
    registry()
      .into_iter()
      .filter(|spec| (spec.core || comprehensive) && (spec.enabled)(&self.config.analyzers))
      .map(|spec| spec.analyzer)
      .collect()
  }

  /// Run analysis over `files`.
  ///
  /// Metrics are computed from the unfiltered issue set; the threshold only
  /// narrows the reported list.
  pub fn run(&self, files: &[FileRecord], options: &EngineOptions) -> WardenResult<AnalysisReport> {
    let started = Instant::now();
    let analyzers = self.select(options.comprehensive);
    let batch_size = options.batch_size.max(1);
    let task_concurrency = options.task_concurrency.max(1);
    let total_batches = files.len().div_ceil(batch_size);

    let mut tracker = ProgressTracker::new(files.len());
    let mut all_issues: Vec<Issue> = Vec::new();
    let mut processed = 0usize;

    for (batch_index, batch) in files.chunks(batch_size).enumerate() {
      for chunk in analyzers.chunks(task_concurrency) {
        let outcomes: WardenResult<Vec<Vec<Issue>>> = chunk
          .par_iter()
          .map(|analyzer| {
            analyzer.analyze(batch, &self.config).map_err(|e| WardenError::Analysis {
              analyzer: analyzer.name().to_string(),
              message: e.to_string(),
            })
          })
          .collect();
        for issues in outcomes? {
          all_issues.extend(issues);
        }
      }

      processed += batch.len();
      if let Some(snapshot) = tracker.update(processed, batch_index, total_batches)
        && let Some(progress) = options.progress
      {
        progress(&snapshot);
      }

      if (batch_index + 1) % MEMORY_HINT_INTERVAL == 0
        && let Some(hint) = options.memory_pressure
      {
        hint();
      }
    }

    all_issues.sort_by(|a, b| {
      b.severity
        .cmp(&a.severity)
        .then_with(|| a.file.cmp(&b.file))
        .then_with(|| a.line.cmp(&b.line))
    });

    let metrics = ProjectMetrics::compute(files, &all_issues)?;

    let mut analyzer_metrics = BTreeMap::new();
    for analyzer in &analyzers {
      if let Some(value) = analyzer.calculate_metrics(files) {
        analyzer_metrics.insert(analyzer.name().to_string(), value);
      }
    }

    let reported = filter_by_threshold(&all_issues, options.threshold);
    let summary = summarize(files.len(), &all_issues, &reported);

    Ok(AnalysisReport {
      issues: reported,
      metrics,
      analyzer_metrics,
      summary,
      duration: started.elapsed(),
    })
  }
}

fn summarize(files_analyzed: usize, all: &[Issue], reported: &[Issue]) -> AnalysisSummary {
  let mut summary = AnalysisSummary {
    files_analyzed,
    total_issues: all.len(),
    reported_issues: reported.len(),
    auto_fixable: reported.iter().filter(|i| i.auto_fixable).count(),
    ..AnalysisSummary::default()
  };
  for issue in reported {
    *summary.by_severity.entry(issue.severity.to_string()).or_insert(0) += 1;
    *summary.by_category.entry(issue.category.clone()).or_insert(0) += 1;
  }
  summary
}
