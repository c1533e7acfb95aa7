//! Test gate: runs the project's own test suite before and after a mutating
//! operation.
//!
//! Runners are tried in a fixed order, but a runner is only attempted when
//! its ecosystem marker is present (a Cargo.toml for cargo, a real npm test
//! script for the JS managers, and so on). A runner that starts but fails or
//! times out blocks the operation; a missing runner binary falls through to
//! the next candidate. When no runner applies, a heuristic scan for test
//! files decides: none found means the gate is skipped, since many targets
//! legitimately have no test suite.

use crate::core::error::WardenResult;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// A candidate test runner and the project marker that makes it applicable
struct GateRunner {
  argv: &'static [&'static str],
  applies: fn(&Path) -> bool,
}

/// Candidate runners, tried in order. `cargo test` would spawn (and fail) in
/// any directory, so each runner is gated on its own ecosystem marker.
const GATE_RUNNERS: &[GateRunner] = &[
  GateRunner {
    argv: &["cargo", "test"],
    applies: |root| root.join("Cargo.toml").is_file(),
  },
  GateRunner {
    argv: &["npm", "test"],
    applies: has_npm_test_script,
  },
  GateRunner {
    argv: &["yarn", "test"],
    applies: |root| root.join("yarn.lock").is_file() && has_npm_test_script(root),
  },
  GateRunner {
    argv: &["pnpm", "test"],
    applies: |root| root.join("pnpm-lock.yaml").is_file() && has_npm_test_script(root),
  },
  GateRunner {
    argv: &["pytest"],
    applies: |root| contains_file(root, 0, &is_python_test),
  },
  GateRunner {
    argv: &["go", "test", "./..."],
    applies: |root| root.join("go.mod").is_file(),
  },
];

/// Directories never descended into while looking for test files
const TEST_SCAN_SKIP: &[&str] = &[
  "node_modules",
  ".git",
  "target",
  "dist",
  "build",
  "coverage",
  ".warden",
  "__pycache__",
];

/// Depth bound for the test-file scan
const TEST_SCAN_MAX_DEPTH: usize = 6;

/// Poll interval while waiting for the runner to exit
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a gate run
#[derive(Debug, Clone)]
pub enum GateOutcome {
  Passed { command: String },
  Failed { command: String, detail: String },
  Skipped { reason: String },
}

impl GateOutcome {
  pub fn passed(&self) -> bool {
    !matches!(self, GateOutcome::Failed { .. })
  }
}

/// A gate implementation. Injectable so the safety manager can be exercised
/// without a real test suite.
pub trait Gate: Send + Sync {
  fn run(&self, project_root: &Path) -> WardenResult<GateOutcome>;
}

/// Gate backed by the project's real test runner.
pub struct CommandGate {
  timeout: Duration,
}

impl CommandGate {
  pub fn new(timeout: Duration) -> Self {
    Self { timeout }
  }

  fn run_command(&self, argv: &[&str], project_root: &Path) -> Option<GateOutcome> {
    let command = argv.join(" ");
    let mut child = Command::new(argv[0])
      .args(&argv[1..])
      .current_dir(project_root)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .ok()?;

    // Drain pipes on threads so a chatty runner cannot deadlock the poll loop
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match self.wait_with_deadline(&mut child) {
      Some(status) => status,
      None => {
        let _ = child.kill();
        let _ = child.wait();
        return Some(GateOutcome::Failed {
          command,
          detail: format!("timed out after {}s", self.timeout.as_secs()),
        });
      }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    if status {
      Some(GateOutcome::Passed { command })
    } else {
      let detail = tail(&format!("{}{}", stdout, stderr), 30);
      Some(GateOutcome::Failed { command, detail })
    }
  }

  /// Poll until exit or deadline. Returns None on timeout.
  fn wait_with_deadline(&self, child: &mut Child) -> Option<bool> {
    let deadline = Instant::now() + self.timeout;
    loop {
      match child.try_wait() {
        Ok(Some(status)) => return Some(status.success()),
        Ok(None) => {
          if Instant::now() >= deadline {
            return None;
          }
          thread::sleep(POLL_INTERVAL);
        }
        Err(_) => return Some(false),
      }
    }
  }
}

impl Gate for CommandGate {
  fn run(&self, project_root: &Path) -> WardenResult<GateOutcome> {
    let mut blocked: Option<GateOutcome> = None;
    for runner in GATE_RUNNERS {
      if !(runner.applies)(project_root) {
        continue;
      }
      match self.run_command(runner.argv, project_root) {
        Some(outcome @ GateOutcome::Passed { .. }) => return Ok(outcome),
        Some(outcome @ GateOutcome::Failed { .. }) => {
          // A suite that ran and failed blocks even if a later runner is
          // unavailable; keep the first failure for the error detail.
          blocked.get_or_insert(outcome);
        }
        // Runner binary missing; try the next candidate
        _ => {}
      }
    }

    if let Some(outcome) = blocked {
      return Ok(outcome);
    }
    if contains_file(project_root, 0, &is_test_file) {
      return Ok(GateOutcome::Failed {
        command: "(none)".to_string(),
        detail: "test files present but no runner could execute them".to_string(),
      });
    }
    Ok(GateOutcome::Skipped {
      reason: "no test suite found".to_string(),
    })
  }
}

/// Whether package.json declares a real test script. npm's scaffolded
/// placeholder script exits non-zero by construction, so it does not count
/// as a suite.
fn has_npm_test_script(root: &Path) -> bool {
  let Ok(raw) = std::fs::read_to_string(root.join("package.json")) else {
    return false;
  };
  let Ok(pkg) = serde_json::from_str::<serde_json::Value>(&raw) else {
    return false;
  };
  match pkg.get("scripts").and_then(|s| s.get("test")).and_then(|t| t.as_str()) {
    Some(script) => !script.contains("no test specified"),
    None => false,
  }
}

/// Bounded walk for a file whose name satisfies `matches`
fn contains_file(dir: &Path, depth: usize, matches: &dyn Fn(&str) -> bool) -> bool {
  if depth > TEST_SCAN_MAX_DEPTH {
    return false;
  }
  let Ok(entries) = std::fs::read_dir(dir) else {
    return false;
  };
  for entry in entries.flatten() {
    let name = entry.file_name();
    let name = name.to_string_lossy();
    let path = entry.path();
    if path.is_dir() {
      if !TEST_SCAN_SKIP.contains(&name.as_ref()) && contains_file(&path, depth + 1, matches) {
        return true;
      }
    } else if matches(&name) {
      return true;
    }
  }
  false
}

fn is_python_test(name: &str) -> bool {
  (name.starts_with("test_") && name.ends_with(".py")) || name.ends_with("_test.py")
}

fn is_test_file(name: &str) -> bool {
  const SUFFIXES: &[&str] = &[
    ".test.ts", ".test.tsx", ".test.js", ".test.jsx", ".spec.ts", ".spec.js", "_test.go",
  ];
  is_python_test(name) || SUFFIXES.iter().any(|s| name.ends_with(s))
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> thread::JoinHandle<String> {
  thread::spawn(move || {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
      let _ = pipe.read_to_string(&mut buf);
    }
    buf
  })
}

/// Last `n` lines of runner output, for error detail
fn tail(text: &str, n: usize) -> String {
  let lines: Vec<&str> = text.lines().collect();
  let start = lines.len().saturating_sub(n);
  lines[start..].join("\n")
}

/// Gate that always returns a fixed outcome. Test-only seam for the safety
/// manager, also used by `--no-verify` style flows.
pub struct StaticGate {
  outcome: fn() -> GateOutcome,
}

impl StaticGate {
  pub fn passing() -> Self {
    Self {
      outcome: || GateOutcome::Passed {
        command: "static".to_string(),
      },
    }
  }

  pub fn failing() -> Self {
    Self {
      outcome: || GateOutcome::Failed {
        command: "static".to_string(),
        detail: "forced failure".to_string(),
      },
    }
  }

  pub fn skipped() -> Self {
    Self {
      outcome: || GateOutcome::Skipped {
        reason: "gate disabled".to_string(),
      },
    }
  }
}

impl Gate for StaticGate {
  fn run(&self, _project_root: &Path) -> WardenResult<GateOutcome> {
    Ok((self.outcome)())
  }
}
