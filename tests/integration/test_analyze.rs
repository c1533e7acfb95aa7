//! Integration tests for `warden analyze`

use crate::helpers::{TestProject, run_warden, spawn_warden, stdout_of};
use anyhow::Result;

#[test]
fn test_analyze_json_report_shape() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", "const x = 1;   \nexport const y = 2;\n")?;

  let output = run_warden(&project.path, &["analyze", "--json"])?;
  let json: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;

  assert!(json["issues"].is_array());
  assert_eq!(json["summary"]["files_analyzed"], 1);
  assert!(json["metrics"]["tech_debt_score"].as_f64().unwrap() >= 0.0);
  // Trailing whitespace is a core complexity finding
  let issues = json["issues"].as_array().unwrap();
  assert!(issues.iter().any(|i| i["issue_type"] == "trailing-whitespace"));
  Ok(())
}

#[test]
fn test_threshold_narrows_report_but_not_metrics() -> Result<()> {
  let project = TestProject::new()?;
  // One low finding (trailing whitespace) and one critical (secret)
  project.write("src/app.ts", "const x = 1;   \nconst cfg = { api_key: \"sk-abcdef\" };\n")?;

  let all = run_warden(&project.path, &["analyze", "--comprehensive", "--json"])?;
  let all: serde_json::Value = serde_json::from_str(&stdout_of(&all))?;

  let narrowed = run_warden(
    &project.path,
    &["analyze", "--comprehensive", "--threshold", "critical", "--json"],
  )?;
  let narrowed: serde_json::Value = serde_json::from_str(&stdout_of(&narrowed))?;

  let all_count = all["issues"].as_array().unwrap().len();
  let narrowed_issues = narrowed["issues"].as_array().unwrap();
  assert!(narrowed_issues.len() < all_count);
  assert!(narrowed_issues.iter().all(|i| i["severity"] == "critical"));

  // Metrics are computed pre-filter: identical either way
  assert_eq!(all["metrics"]["remediation_hours"], narrowed["metrics"]["remediation_hours"]);
  assert_eq!(all["summary"]["total_issues"], narrowed["summary"]["total_issues"]);
  Ok(())
}

#[test]
fn test_comprehensive_enables_security_analyzer() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", "const cfg = { password: \"hunter22\" };\n")?;

  let core = run_warden(&project.path, &["analyze", "--json"])?;
  let core: serde_json::Value = serde_json::from_str(&stdout_of(&core))?;
  let full = run_warden(&project.path, &["analyze", "--comprehensive", "--json"])?;
  let full: serde_json::Value = serde_json::from_str(&stdout_of(&full))?;

  let has_credential = |v: &serde_json::Value| {
    v["issues"]
      .as_array()
      .unwrap()
      .iter()
      .any(|i| i["issue_type"] == "hardcoded-credential")
  };
  assert!(!has_credential(&core));
  assert!(has_credential(&full));
  Ok(())
}

#[test]
fn test_strict_exits_nonzero_on_findings() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", "const x = 1;   \n")?;

  let output = spawn_warden(&project.path, &["analyze", "--strict"])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}

#[test]
fn test_invalid_threshold_is_user_error() -> Result<()> {
  let project = TestProject::new()?;
  project.write("src/app.ts", "export const x = 1;\n")?;

  let output = spawn_warden(&project.path, &["analyze", "--threshold", "severe"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Invalid severity threshold"));
  Ok(())
}

#[test]
fn test_config_disables_analyzer() -> Result<()> {
  let project = TestProject::new()?;
  project.write("warden.yml", "analyzers:\n  security:\n    enabled: false\n")?;
  project.write("src/app.ts", "const cfg = { password: \"hunter22\" };\n")?;

  let output = run_warden(&project.path, &["analyze", "--comprehensive", "--json"])?;
  let json: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;
  assert!(
    !json["issues"]
      .as_array()
      .unwrap()
      .iter()
      .any(|i| i["category"] == "security")
  );
  Ok(())
}
