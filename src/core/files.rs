//! File scanning: walks a source tree and produces immutable `FileRecord`
//! snapshots for the analysis pipeline.

use crate::core::config::ScanConfig;
use crate::core::error::{ResultExt, WardenResult};
use chrono::{DateTime, Utc};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

/// Immutable snapshot of a scanned file. Read-only to analyzers.
#[derive(Debug, Clone)]
pub struct FileRecord {
  /// Absolute path on disk
  pub path: PathBuf,
  /// Path relative to the scanned root (graph key, backup mirror path)
  pub relative: PathBuf,
  /// File size in bytes at scan time
  pub size: u64,
  /// Language tag derived from the extension
  pub language: Language,
  /// Last modification time at scan time
  pub modified: DateTime<Utc>,
}

impl FileRecord {
  /// Read the file's current content as UTF-8
  pub fn read(&self) -> WardenResult<String> {
    fs::read_to_string(&self.path).with_context(|| format!("Failed to read {}", self.path.display()))
  }
}

/// Language tag for a scanned file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
  TypeScript,
  JavaScript,
  Python,
  Rust,
  Go,
  Other,
}

impl Language {
  /// Classify by file extension
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("ts" | "tsx") => Language::TypeScript,
      Some("js" | "jsx" | "mjs" | "cjs") => Language::JavaScript,
      Some("py") => Language::Python,
      Some("rs") => Language::Rust,
      Some("go") => Language::Go,
      _ => Language::Other,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Language::TypeScript => "typescript",
      Language::JavaScript => "javascript",
      Language::Python => "python",
      Language::Rust => "rust",
      Language::Go => "go",
      Language::Other => "other",
    }
  }
}

/// File scanner with glob include/exclude filtering
pub struct FileScanner {
  root: PathBuf,
  include: Vec<Pattern>,
  exclude: Vec<Pattern>,
  skip_dirs: Vec<String>,
  max_file_size: u64,
}

impl FileScanner {
  /// Create a scanner for a root directory from scan config
  pub fn new(root: impl Into<PathBuf>, config: &ScanConfig) -> WardenResult<Self> {
    let include = config
      .include
      .iter()
      .map(|p| Pattern::new(p))
      .collect::<Result<Vec<_>, _>>()?;
    let exclude = config
      .exclude
      .iter()
      .map(|p| Pattern::new(p))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      root: root.into(),
      include,
      exclude,
      skip_dirs: config.skip_dirs.clone(),
      max_file_size: config.max_file_size,
    })
  }

  /// Walk the tree and collect matching file records, sorted by relative
  /// path for deterministic downstream ordering.
  pub fn scan(&self) -> WardenResult<Vec<FileRecord>> {
    let mut records = Vec::new();
    self.walk(&self.root, &mut records)?;
    records.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(records)
  }

  fn walk(&self, dir: &Path, records: &mut Vec<FileRecord>) -> WardenResult<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    for entry in entries {
      let entry = entry?;
      let path = entry.path();
      let file_type = entry.file_type()?;

      if file_type.is_dir() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if self.skip_dirs.iter().any(|d| d == name.as_ref()) {
          continue;
        }
        self.walk(&path, records)?;
      } else if file_type.is_file()
        && let Some(record) = self.record_for(&path)?
      {
        records.push(record);
      }
    }

    Ok(())
  }

  fn record_for(&self, path: &Path) -> WardenResult<Option<FileRecord>> {
    let relative = path.strip_prefix(&self.root)?.to_path_buf();

    if !self.matches(&relative) {
      return Ok(None);
    }

    let metadata = fs::metadata(path)?;
    if metadata.len() > self.max_file_size {
      return Ok(None);
    }

    let modified = metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());

    Ok(Some(FileRecord {
      path: path.to_path_buf(),
      relative: relative.clone(),
      size: metadata.len(),
      language: Language::from_path(&relative),
      modified,
    }))
  }

  fn matches(&self, relative: &Path) -> bool {
    let included = self.include.is_empty() || self.include.iter().any(|p| p.matches_path(relative));
    let excluded = self.exclude.iter().any(|p| p.matches_path(relative));
    included && !excluded
  }
}
