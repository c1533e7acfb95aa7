//! Terminal UI helpers: progress tracking and bar rendering

pub mod progress;
