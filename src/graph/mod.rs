//! Import-graph analysis
//!
//! Built on petgraph for direct control and minimal abstraction; warden owns
//! its domain types (DependencyNode, CircularPath) and queries.

pub mod import_graph;

pub use import_graph::{CircularPath, DependencyNode, ImportGraph};
