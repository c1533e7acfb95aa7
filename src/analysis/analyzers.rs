//! Built-in line/regex analyzers
//!
//! These are deliberately lightweight heuristics, not AST passes. The
//! engine's contract with them (`Analyzer`) is the load-bearing part; the
//! rules themselves stay small and tunable through config.

use crate::analysis::analyzer::Analyzer;
use crate::analysis::issue::{Issue, Severity};
use crate::core::config::WardenConfig;
use crate::core::error::WardenResult;
use crate::core::files::FileRecord;
use regex::Regex;
use std::sync::OnceLock;

/// Complexity heuristics: file length, line length, nesting depth, and the
/// auto-fixable trailing-whitespace finding.
pub struct ComplexityAnalyzer;

impl Analyzer for ComplexityAnalyzer {
  fn name(&self) -> &str {
    "complexity"
  }

  fn description(&self) -> &str {
    "File length, line length, nesting depth, trailing whitespace"
  }

  fn analyze(&self, files: &[FileRecord], config: &WardenConfig) -> WardenResult<Vec<Issue>> {
    let rules = &config.analyzers.complexity;
    let mut issues = Vec::new();

    for file in files {
      let content = file.read()?;
      let line_count = content.lines().count();

      if line_count > rules.max_file_lines {
        issues.push(
          Issue::new(
            "file-too-long",
            Severity::Medium,
            self.name(),
            format!("File has {} lines (limit {})", line_count, rules.max_file_lines),
            "Long files are hard to navigate and usually mix responsibilities.",
            &file.relative,
          )
          .with_suggestion("Split the file along its responsibilities"),
        );
      }

      for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;

        if line.len() > rules.max_line_length {
          issues.push(
            Issue::new(
              "line-too-long",
              Severity::Low,
              self.name(),
              format!("Line exceeds {} characters", rules.max_line_length),
              format!("Line is {} characters long.", line.len()),
              &file.relative,
            )
            .at_line(lineno),
          );
        }

        let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
        if !line.trim().is_empty() && indent / 2 > rules.max_nesting {
          issues.push(
            Issue::new(
              "deep-nesting",
              Severity::Medium,
              self.name(),
              format!("Nesting deeper than {} levels", rules.max_nesting),
              "Deeply nested code usually wants early returns or extraction.",
              &file.relative,
            )
            .at_line(lineno)
            .with_suggestion("Extract inner blocks into functions or invert conditions"),
          );
        }

        if line != line.trim_end() && !line.trim().is_empty() {
          issues.push(
            Issue::new(
              "trailing-whitespace",
              Severity::Low,
              self.name(),
              "Trailing whitespace".to_string(),
              "Line ends with whitespace characters.",
              &file.relative,
            )
            .at_line(lineno)
            .with_suggestion("Remove trailing whitespace")
            .fixable(),
          );
        }
      }
    }

    Ok(issues)
  }

  fn calculate_metrics(&self, files: &[FileRecord]) -> Option<serde_json::Value> {
    let mut line_counts = Vec::new();
    for file in files {
      if let Ok(content) = file.read() {
        line_counts.push(content.lines().count());
      }
    }
    if line_counts.is_empty() {
      return None;
    }
    let max = *line_counts.iter().max().unwrap_or(&0);
    let avg = line_counts.iter().sum::<usize>() as f64 / line_counts.len() as f64;
    Some(serde_json::json!({ "avg_file_lines": avg, "max_file_lines": max }))
  }
}

/// Wraps the import graph: one issue per detected cycle.
pub struct DependencyAnalyzer;

impl Analyzer for DependencyAnalyzer {
  fn name(&self) -> &str {
    "dependency"
  }

  fn description(&self) -> &str {
    "Circular import detection over the batch's import graph"
  }

  fn analyze(&self, files: &[FileRecord], _config: &WardenConfig) -> WardenResult<Vec<Issue>> {
    let graph = crate::graph::ImportGraph::build(files)?;
    let mut issues = Vec::new();

    for cycle in graph.find_cycles() {
      let first = cycle.nodes.first().cloned().unwrap_or_default();
      issues.push(
        Issue::new(
          "circular-dependency",
          cycle.severity,
          self.name(),
          format!("Circular dependency across {} files", cycle.len()),
          format!("Import cycle: {}", cycle.display()),
          first,
        )
        .with_suggestion("Break the cycle by extracting the shared pieces into a separate module"),
      );
    }

    Ok(issues)
  }
}

fn declaration_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"\b(?:let|const|var)\s+([A-Za-z_$][\w$]*)").unwrap())
}

/// Identifier style checks on variable declarations.
pub struct NamingAnalyzer;

impl NamingAnalyzer {
  fn violates(style: &str, name: &str) -> bool {
    // SCREAMING_SNAKE constants are conventional in either style
    if name.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit()) {
      return false;
    }
    match style {
      "camelCase" => name.contains('_'),
      "snake_case" => name.chars().any(|c| c.is_ascii_uppercase()),
      _ => false,
    }
  }
}

impl Analyzer for NamingAnalyzer {
  fn name(&self) -> &str {
    "naming"
  }

  fn description(&self) -> &str {
    "Variable declaration style (camelCase / snake_case)"
  }

  fn analyze(&self, files: &[FileRecord], config: &WardenConfig) -> WardenResult<Vec<Issue>> {
    let style = config.analyzers.naming.style.as_str();
    let mut issues = Vec::new();

    for file in files {
      let content = file.read()?;
      for (idx, line) in content.lines().enumerate() {
        for cap in declaration_pattern().captures_iter(line) {
          let name = &cap[1];
          if Self::violates(style, name) {
            issues.push(
              Issue::new(
                "naming-style",
                Severity::Low,
                self.name(),
                format!("'{}' does not match {} style", name, style),
                format!("Declared identifier '{}' violates the configured naming style.", name),
                &file.relative,
              )
              .at_line(idx + 1),
            );
          }
        }
      }
    }

    Ok(issues)
  }
}

fn sql_concat_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    // Quoted SQL followed by `+`, or a template literal interpolating into SQL
    Regex::new(r#"(?i)["'][^"']*\b(?:select|insert|update|delete)\b[^"']*["']\s*\+|`[^`]*\b(?:select|insert|update|delete)\b[^`]*\$\{"#)
      .unwrap()
  })
}

/// Flags string-built SQL, the classic injection vector.
pub struct SqlAnalyzer;

impl Analyzer for SqlAnalyzer {
  fn name(&self) -> &str {
    "sql"
  }

  fn description(&self) -> &str {
    "String-concatenated SQL detection"
  }

  fn analyze(&self, files: &[FileRecord], _config: &WardenConfig) -> WardenResult<Vec<Issue>> {
    let mut issues = Vec::new();

    for file in files {
      let content = file.read()?;
      for (idx, line) in content.lines().enumerate() {
        if sql_concat_pattern().is_match(line) {
          issues.push(
            Issue::new(
              "sql-string-concatenation",
              Severity::High,
              self.name(),
              "SQL built by string concatenation".to_string(),
              "Concatenating values into SQL enables injection.",
              &file.relative,
            )
            .at_line(idx + 1)
            .with_suggestion("Use parameterized queries / prepared statements"),
          );
        }
      }
    }

    Ok(issues)
  }
}

fn secret_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r#"(?i)\b(password|passwd|secret|api_?key|auth_?token)\b\s*[:=]\s*["'][^"']{4,}["']"#).unwrap())
}

fn eval_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"\beval\s*\(").unwrap())
}

/// Security heuristics: hardcoded credentials and eval usage.
pub struct SecurityAnalyzer;

impl Analyzer for SecurityAnalyzer {
  fn name(&self) -> &str {
    "security"
  }

  fn description(&self) -> &str {
    "Hardcoded credentials and dangerous constructs"
  }

  fn analyze(&self, files: &[FileRecord], _config: &WardenConfig) -> WardenResult<Vec<Issue>> {
    let mut issues = Vec::new();

    for file in files {
      let content = file.read()?;
      for (idx, line) in content.lines().enumerate() {
        if secret_pattern().is_match(line) {
          issues.push(
            Issue::new(
              "hardcoded-credential",
              Severity::Critical,
              self.name(),
              "Possible hardcoded credential".to_string(),
              "Credential-looking literal assigned in source.",
              &file.relative,
            )
            .at_line(idx + 1)
            .with_suggestion("Move secrets to environment variables or a secret store"),
          );
        }
        if eval_pattern().is_match(line) {
          issues.push(
            Issue::new(
              "eval-usage",
              Severity::High,
              self.name(),
              "eval() usage".to_string(),
              "eval executes arbitrary strings as code.",
              &file.relative,
            )
            .at_line(idx + 1),
          );
        }
      }
    }

    Ok(issues)
  }
}

/// Test presence heuristics: flags source files without a sibling test.
pub struct TestCoverageAnalyzer;

impl TestCoverageAnalyzer {
  /// Whether a file looks like a test by naming convention
  pub fn is_test_file(record: &FileRecord) -> bool {
    let name = record.relative.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    name.contains(".test.") || name.contains(".spec.") || name.starts_with("test_") || name.ends_with("_test.py")
  }
}

impl Analyzer for TestCoverageAnalyzer {
  fn name(&self) -> &str {
    "tests"
  }

  fn description(&self) -> &str {
    "Source files lacking a matching test file"
  }

  fn analyze(&self, files: &[FileRecord], _config: &WardenConfig) -> WardenResult<Vec<Issue>> {
    let test_stems: Vec<String> = files
      .iter()
      .filter(|f| Self::is_test_file(f))
      .filter_map(|f| f.relative.file_name().map(|n| n.to_string_lossy().to_string()))
      .collect();

    let mut issues = Vec::new();
    for file in files {
      if Self::is_test_file(file) {
        continue;
      }
      let stem = match file.relative.file_stem().and_then(|s| s.to_str()) {
        Some(s) => s.to_string(),
        None => continue,
      };
      let has_test = test_stems.iter().any(|t| t.contains(&stem));
      if !has_test {
        issues.push(
          Issue::new(
            "missing-test",
            Severity::Low,
            self.name(),
            format!("No test file found for {}", file.relative.display()),
            "Source file has no sibling test by naming convention.",
            &file.relative,
          )
          .with_suggestion(format!("Add {}.test.* alongside the source", stem)),
        );
      }
    }

    Ok(issues)
  }

  fn calculate_metrics(&self, files: &[FileRecord]) -> Option<serde_json::Value> {
    let tests = files.iter().filter(|f| Self::is_test_file(f)).count();
    let sources = files.len().saturating_sub(tests);
    let ratio = if sources == 0 { 1.0 } else { tests as f64 / sources as f64 };
    Some(serde_json::json!({ "test_files": tests, "source_files": sources, "coverage_ratio": ratio }))
  }
}
