//! Integration tests for `warden graph`

use crate::helpers::{TestProject, run_warden, spawn_warden, stdout_of};
use anyhow::Result;

#[test]
fn test_graph_reports_cycle() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/a.ts", "import { b } from './b';\nexport const a = 1;\n")?;
  project.write("src/b.ts", "import { c } from './c';\nexport const b = 2;\n")?;
  project.write("src/c.ts", "import { a } from './a';\nexport const c = 3;\n")?;

  let output = run_warden(&project.path, &["graph", "--json"])?;
  let json: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;

  assert_eq!(json["nodes"], 3);
  let cycles = json["cycles"].as_array().unwrap();
  assert_eq!(cycles.len(), 1);
  // Three distinct files in the cycle
  assert_eq!(cycles[0]["length"], 3);
  let path = cycles[0]["path"].as_str().unwrap();
  assert!(path.starts_with("src/a.ts"));
  assert!(path.ends_with("src/a.ts"));
  Ok(())
}

#[test]
fn test_graph_clean_project() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/a.ts", "import { b } from './b';\nexport const a = 1;\n")?;
  project.write("src/b.ts", "export const b = 2;\n")?;

  let output = run_warden(&project.path, &["graph"])?;
  assert!(stdout_of(&output).contains("No circular dependencies"));
  Ok(())
}

#[test]
fn test_graph_counts_external_packages() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/a.ts", "import React from 'react';\nimport { x } from 'lodash';\nexport const a = 1;\n")?;

  let output = run_warden(&project.path, &["graph", "--json"])?;
  let json: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;
  assert_eq!(json["external_dependencies"], 2);
  assert_eq!(json["edges"], 0);
  Ok(())
}

#[test]
fn test_graph_strict_exits_on_cycles() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/a.ts", "import { b } from './b';\nexport const a = 1;\n")?;
  project.write("src/b.ts", "import { a } from './a';\nexport const b = 2;\n")?;

  let output = spawn_warden(&project.path, &["graph", "--strict"])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}
