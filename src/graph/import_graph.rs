//! Import graph built from file contents + petgraph
//!
//! Nodes are scanned files, edges are resolved relative imports. External
//! package references are tracked per node but excluded from the graph and
//! from cycle detection. The graph is rebuilt fresh every run.

use crate::analysis::issue::Severity;
use crate::core::error::WardenResult;
use crate::core::files::FileRecord;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Extensions tried in order when a reference has no resolvable suffix
const RESOLVE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Index filenames tried when a reference points at a directory
const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js"];

/// A file node in the import graph
#[derive(Debug, Clone)]
pub struct DependencyNode {
  /// Relative path (graph key)
  pub path: PathBuf,
  /// Resolved imports of other files in this run's graph
  pub imports: Vec<PathBuf>,
  /// Opaque external package references (excluded from cycle detection)
  pub external: Vec<String>,
  /// Whether the file exports anything
  pub has_exports: bool,
}

/// An import cycle: ordered path of files with first == last
#[derive(Debug, Clone)]
pub struct CircularPath {
  pub nodes: Vec<PathBuf>,
  pub severity: Severity,
}

impl CircularPath {
  /// Number of distinct files in the cycle
  pub fn len(&self) -> usize {
    self.nodes.len().saturating_sub(1)
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Render as "a.ts → b.ts → a.ts"
  pub fn display(&self) -> String {
    self
      .nodes
      .iter()
      .map(|p| p.to_string_lossy().to_string())
      .collect::<Vec<_>>()
      .join(" -> ")
  }
}

fn import_patterns() -> &'static [Regex; 3] {
  static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
  PATTERNS.get_or_init(|| {
    [
      // import ... from '...'; bare `import '...'` side-effect imports too
      Regex::new(r#"import\s+(?:[\w*{}\s,$]+\s+from\s+)?['"]([^'"]+)['"]"#).unwrap(),
      Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap(),
      Regex::new(r#"export\s+[\w*{}\s,$]+\s+from\s+['"]([^'"]+)['"]"#).unwrap(),
    ]
  })
}

fn export_marker() -> &'static Regex {
  static MARKER: OnceLock<Regex> = OnceLock::new();
  MARKER.get_or_init(|| Regex::new(r"(?m)^\s*(?:export\s|module\.exports)").unwrap())
}

/// Import graph over one run's scanned files
pub struct ImportGraph {
  graph: DiGraph<DependencyNode, ()>,
  path_to_node: HashMap<PathBuf, NodeIndex>,
  /// Node indices in deterministic build order
  order: Vec<NodeIndex>,
}

impl ImportGraph {
  /// Build the graph by reading scanned file contents.
  ///
  /// Unreadable or non-UTF-8 files become import-free nodes; unresolvable
  /// references are recovered locally as excluded edges, never errors.
  pub fn build(files: &[FileRecord]) -> WardenResult<Self> {
    let sources: Vec<(PathBuf, String)> = files
      .iter()
      .map(|f| (f.relative.clone(), f.read().unwrap_or_default()))
      .collect();
    Ok(Self::from_sources(sources))
  }

  /// Build from in-memory (relative path, content) pairs
  pub fn from_sources(sources: Vec<(PathBuf, String)>) -> Self {
    let known: HashSet<PathBuf> = sources.iter().map(|(p, _)| p.clone()).collect();

    let mut graph = DiGraph::new();
    let mut path_to_node = HashMap::new();
    let mut order = Vec::new();

    // First pass: nodes
    for (path, content) in &sources {
      let node = DependencyNode {
        path: path.clone(),
        imports: Vec::new(),
        external: Vec::new(),
        has_exports: export_marker().is_match(content),
      };
      let idx = graph.add_node(node);
      path_to_node.insert(path.clone(), idx);
      order.push(idx);
    }

    // Second pass: edges
    for (path, content) in &sources {
      let from_idx = path_to_node[path];
      let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

      for reference in extract_references(content) {
        if reference.starts_with('.') || reference.starts_with('/') {
          if let Some(target) = resolve_reference(base_dir, &reference, &known) {
            let to_idx = path_to_node[&target];
            if graph.find_edge(from_idx, to_idx).is_none() {
              graph.add_edge(from_idx, to_idx, ());
            }
            graph[from_idx].imports.push(target);
          }
          // Unresolvable relative reference: excluded edge, recovered locally
        } else {
          graph[from_idx].external.push(reference);
        }
      }
    }

    Self {
      graph,
      path_to_node,
      order,
    }
  }

  /// Number of files in the graph
  pub fn node_count(&self) -> usize {
    self.graph.node_count()
  }

  /// Number of resolved internal import edges
  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  /// Total external package references across all nodes
  pub fn external_count(&self) -> usize {
    self.order.iter().map(|idx| self.graph[*idx].external.len()).sum()
  }

  /// Look up a node by relative path
  pub fn node(&self, path: &Path) -> Option<&DependencyNode> {
    self.path_to_node.get(path).map(|idx| &self.graph[*idx])
  }

  /// All nodes in deterministic build order
  pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
    self.order.iter().map(|idx| &self.graph[*idx])
  }

  /// Detect import cycles with a single-pass DFS.
  ///
  /// Hitting a node already on the active recursion stack emits the
  /// sub-path from its first occurrence through the current node. Each node
  /// is globally visited at most once, so only cycles reachable from
  /// still-unvisited roots in traversal order are reported. This is a
  /// deliberate heuristic, not exhaustive SCC enumeration.
  pub fn find_cycles(&self) -> Vec<CircularPath> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut stack: Vec<NodeIndex> = Vec::new();
    let mut cycles = Vec::new();

    for root in &self.order {
      if !visited.contains(root) {
        self.dfs(*root, &mut visited, &mut stack, &mut cycles);
      }
    }

    cycles
  }

  fn dfs(
    &self,
    node: NodeIndex,
    visited: &mut HashSet<NodeIndex>,
    stack: &mut Vec<NodeIndex>,
    cycles: &mut Vec<CircularPath>,
  ) {
    visited.insert(node);
    stack.push(node);

    // Neighbor order must be deterministic for reproducible cycle reports
    let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(node, Direction::Outgoing).collect();
    neighbors.sort_by(|a, b| self.graph[*a].path.cmp(&self.graph[*b].path));

    for neighbor in neighbors {
      if let Some(pos) = stack.iter().position(|n| *n == neighbor) {
        let mut nodes: Vec<PathBuf> = stack[pos..].iter().map(|n| self.graph[*n].path.clone()).collect();
        nodes.push(self.graph[neighbor].path.clone());
        let severity = self.cycle_severity(&nodes);
        cycles.push(CircularPath { nodes, severity });
      } else if !visited.contains(&neighbor) {
        self.dfs(neighbor, visited, stack, cycles);
      }
    }

    stack.pop();
  }

  /// Score a cycle: short, loosely coupled cycles are usually accidental;
  /// long, densely interlinked ones indicate deep architectural coupling.
  fn cycle_severity(&self, nodes: &[PathBuf]) -> Severity {
    let members: HashSet<&PathBuf> = nodes.iter().collect();
    let distinct = members.len();

    // Cross-imports: edges between any two distinct cycle members
    let mut cross = 0usize;
    for member in &members {
      if let Some(idx) = self.path_to_node.get(*member) {
        for neighbor in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
          let target = &self.graph[neighbor].path;
          if target != *member && members.contains(target) {
            cross += 1;
          }
        }
      }
    }

    if distinct <= 2 && cross <= 2 {
      Severity::Low
    } else if distinct <= 4 && cross <= 6 {
      Severity::Medium
    } else {
      Severity::High
    }
  }
}

/// Extract import/require/re-export references from file content
fn extract_references(content: &str) -> Vec<String> {
  let mut refs = Vec::new();
  for pattern in import_patterns() {
    for cap in pattern.captures_iter(content) {
      refs.push(cap[1].to_string());
    }
  }
  refs
}

/// Resolve a relative reference against the set of files in this run.
///
/// References starting with `.` or `/` resolve relative to the referencing
/// file's directory, trying the reference as-is, then each extension in
/// order, then index filenames.
fn resolve_reference(base_dir: &Path, reference: &str, known: &HashSet<PathBuf>) -> Option<PathBuf> {
  let trimmed = reference.trim_start_matches('/');
  let joined = normalize(&base_dir.join(trimmed));

  if known.contains(&joined) {
    return Some(joined);
  }

  for ext in RESOLVE_EXTENSIONS {
    let candidate = PathBuf::from(format!("{}.{}", joined.to_string_lossy(), ext));
    if known.contains(&candidate) {
      return Some(candidate);
    }
  }

  for index in INDEX_FILES {
    let candidate = joined.join(index);
    if known.contains(&candidate) {
      return Some(candidate);
    }
  }

  None
}

/// Collapse `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        out.pop();
      }
      other => out.push(other),
    }
  }
  out
}
