//! Graph command
//!
//! Builds the import graph and reports structure plus circular dependencies.

use crate::core::config::WardenConfig;
use crate::core::error::{ExitCode, WardenResult};
use crate::core::files::FileScanner;
use crate::graph::ImportGraph;
use std::path::Path;

pub fn run_graph(root: &Path, json: bool, strict: bool) -> WardenResult<()> {
  let config = WardenConfig::load(root)?;
  let files = FileScanner::new(root, &config.scan)?.scan()?;
  let graph = ImportGraph::build(&files)?;
  let cycles = graph.find_cycles();

  if json {
    let payload = serde_json::json!({
      "nodes": graph.node_count(),
      "edges": graph.edge_count(),
      "external_dependencies": graph.external_count(),
      "cycles": cycles.iter().map(|c| serde_json::json!({
        "severity": c.severity.to_string(),
        "length": c.len(),
        "path": c.display(),
      })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
  } else {
    println!("📊 Import graph: {} modules, {} internal edges, {} external packages\n", graph.node_count(), graph.edge_count(), graph.external_count());

    if cycles.is_empty() {
      println!("✨ No circular dependencies found.");
    } else {
      println!("⚠️  {} circular dependenc{} found:\n", cycles.len(), if cycles.len() == 1 { "y" } else { "ies" });
      for cycle in &cycles {
        println!("   [{}] {}", cycle.severity, cycle.display());
      }
    }
  }

  if strict && !cycles.is_empty() {
    std::process::exit(ExitCode::Validation.as_i32());
  }
  Ok(())
}
