//! Analysis layer: issues, analyzers, metrics, and the orchestrating engine

pub mod analyzer;
pub mod analyzers;
pub mod engine;
pub mod issue;
pub mod metrics;

pub use engine::{AnalysisEngine, AnalysisReport, EngineOptions};
pub use issue::{Issue, Severity};
