//! File change sets: the unit the safety manager applies and rolls back.

use similar::{ChangeTag, TextDiff};
use std::path::PathBuf;

/// Diff lines shown per file in a preview
const PREVIEW_DIFF_LINES: usize = 20;

/// Kind of change to a single file.
///
/// Variant order is the apply order within a file: deletes first, then
/// modifications, then creations, so a delete+create pair on the same path
/// nets out to the new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
  Delete,
  Modify,
  Create,
}

impl ChangeKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ChangeKind::Delete => "delete",
      ChangeKind::Modify => "modify",
      ChangeKind::Create => "create",
    }
  }
}

/// One pending change to one file. Paths are relative to the project root.
#[derive(Debug, Clone)]
pub struct FileChange {
  pub path: PathBuf,
  pub kind: ChangeKind,
  /// Content before the change (None for Create)
  pub original: Option<String>,
  /// Content after the change (None for Delete)
  pub new: Option<String>,
}

impl FileChange {
  pub fn create(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      kind: ChangeKind::Create,
      original: None,
      new: Some(content.into()),
    }
  }

  pub fn modify(path: impl Into<PathBuf>, original: impl Into<String>, new: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      kind: ChangeKind::Modify,
      original: Some(original.into()),
      new: Some(new.into()),
    }
  }

  pub fn delete(path: impl Into<PathBuf>, original: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      kind: ChangeKind::Delete,
      original: Some(original.into()),
      new: None,
    }
  }

  /// Unified diff of this change, truncated to a screenful
  pub fn diff(&self) -> String {
    let before = self.original.as_deref().unwrap_or("");
    let after = self.new.as_deref().unwrap_or("");
    let diff = TextDiff::from_lines(before, after);

    let mut lines = Vec::new();
    for change in diff.iter_all_changes() {
      let sign = match change.tag() {
        ChangeTag::Delete => "-",
        ChangeTag::Insert => "+",
        ChangeTag::Equal => continue,
      };
      lines.push(format!("{}{}", sign, change.value().trim_end_matches('\n')));
    }

    if lines.len() > PREVIEW_DIFF_LINES {
      let omitted = lines.len() - PREVIEW_DIFF_LINES;
      lines.truncate(PREVIEW_DIFF_LINES);
      lines.push(format!("... {} more changed lines", omitted));
    }
    lines.join("\n")
  }
}

/// Sort changes into apply order: grouped by path, deletes before
/// modifications before creations within each path.
pub fn order_changes(changes: &[FileChange]) -> Vec<FileChange> {
  let mut ordered = changes.to_vec();
  ordered.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
  ordered
}

/// Render a dry-run preview of a change set
pub fn preview(changes: &[FileChange]) -> String {
  let mut out = String::new();
  for change in order_changes(changes) {
    out.push_str(&format!("{} {}\n", change.kind.as_str(), change.path.display()));
    let diff = change.diff();
    if !diff.is_empty() {
      out.push_str(&diff);
      out.push('\n');
    }
  }
  out
}
