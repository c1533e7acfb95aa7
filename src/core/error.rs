//! Error types for warden with contextual messages and exit codes
//!
//! Categorizes failures along the lines that matter operationally: validation
//! errors never have side effects, safety errors always report what was rolled
//! back, and analysis errors name the failing analyzer.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for warden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (I/O, subprocess)
  System = 2,
  /// Validation / gate failure (operation refused or rolled back)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for warden
#[derive(Debug)]
pub enum WardenError {
  /// Operation parameter validation failed; nothing was started
  Validation(ValidationError),

  /// Safety protocol failure (apply, gate, rollback)
  Safety(SafetyError),

  /// An analyzer failed; aborts the whole analysis call
  Analysis { analyzer: String, message: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl WardenError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    WardenError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    WardenError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      WardenError::Message { message, context, help } => WardenError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      other => WardenError::Message {
        message: other.to_string(),
        context: Some(ctx_str),
        help: other.help_message(),
      },
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      WardenError::Validation(_) => ExitCode::Validation,
      WardenError::Safety(_) => ExitCode::Validation,
      WardenError::Analysis { .. } => ExitCode::System,
      WardenError::Io(_) => ExitCode::System,
      WardenError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      WardenError::Validation(e) => e.help_message(),
      WardenError::Safety(e) => e.help_message(),
      WardenError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for WardenError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WardenError::Validation(e) => write!(f, "{}", e),
      WardenError::Safety(e) => write!(f, "{}", e),
      WardenError::Analysis { analyzer, message } => {
        write!(f, "Analyzer '{}' failed: {}", analyzer, message)
      }
      WardenError::Io(e) => write!(f, "I/O error: {}", e),
      WardenError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for WardenError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      WardenError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for WardenError {
  fn from(err: io::Error) -> Self {
    WardenError::Io(err)
  }
}

impl From<String> for WardenError {
  fn from(msg: String) -> Self {
    WardenError::message(msg)
  }
}

impl From<&str> for WardenError {
  fn from(msg: &str) -> Self {
    WardenError::message(msg)
  }
}

impl From<serde_json::Error> for WardenError {
  fn from(err: serde_json::Error) -> Self {
    WardenError::message(format!("JSON error: {}", err))
  }
}

impl From<serde_yaml::Error> for WardenError {
  fn from(err: serde_yaml::Error) -> Self {
    WardenError::message(format!("YAML error: {}", err))
  }
}

impl From<glob::PatternError> for WardenError {
  fn from(err: glob::PatternError) -> Self {
    WardenError::message(format!("Invalid glob pattern: {}", err))
  }
}

impl From<regex::Error> for WardenError {
  fn from(err: regex::Error) -> Self {
    WardenError::message(format!("Invalid regex: {}", err))
  }
}

impl From<std::path::StripPrefixError> for WardenError {
  fn from(err: std::path::StripPrefixError) -> Self {
    WardenError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Convert anyhow::Error to WardenError (integration boundaries)
impl From<anyhow::Error> for WardenError {
  fn from(err: anyhow::Error) -> Self {
    WardenError::message(err.to_string())
  }
}

/// Operation parameter validation errors
///
/// These are raised before any side effect: a validation failure guarantees
/// nothing was written, backed up, or logged.
#[derive(Debug)]
pub enum ValidationError {
  /// Too many files targeted by one operation
  TooManyFiles { requested: usize, max_files: usize },

  /// Operation not found (bad id passed to apply/rollback)
  OperationNotFound { operation_id: String },

  /// Empty change set or file list
  NothingToDo { operation_id: String },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::TooManyFiles { max_files, .. } => Some(format!(
        "Split the change into smaller operations or raise safety.max_files (currently {}) in warden.yml.",
        max_files
      )),
      ValidationError::OperationNotFound { .. } => {
        Some("Operation ids are printed when an operation starts and recorded in logs/audit.log.".to_string())
      }
      ValidationError::NothingToDo { .. } => None,
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::TooManyFiles { requested, max_files } => {
        write!(f, "Operation targets {} files, exceeding the limit of {}", requested, max_files)
      }
      ValidationError::OperationNotFound { operation_id } => {
        write!(f, "Unknown operation: {}", operation_id)
      }
      ValidationError::NothingToDo { operation_id } => {
        write!(f, "Operation {} has no changes to apply", operation_id)
      }
    }
  }
}

/// Safety protocol errors
///
/// Raised when a mutating operation fails. When a rollback was performed the
/// error says so explicitly; the caller never has to guess the disk state.
#[derive(Debug)]
pub enum SafetyError {
  /// The test gate refused the operation before any write
  GateBlocked {
    operation_id: String,
    command: String,
    detail: String,
  },

  /// Apply failed and the operation was rolled back
  RolledBack { operation_id: String, reason: String },

  /// Rollback requested but no backup exists for the operation
  NoBackup { operation_id: String },

  /// Rollback itself failed (disk state may be inconsistent)
  RollbackFailed {
    operation_id: String,
    path: PathBuf,
    detail: String,
  },
}

impl SafetyError {
  fn help_message(&self) -> Option<String> {
    match self {
      SafetyError::GateBlocked { command, .. } => Some(format!(
        "The test suite must pass before changes are applied. Fix failures from `{}` and retry.",
        command
      )),
      SafetyError::RolledBack { .. } => Some(
        "All target files were restored from backup. Re-run with --apply after addressing the failure.".to_string(),
      ),
      SafetyError::NoBackup { .. } => Some("Only operations started with backups enabled can be rolled back.".to_string()),
      SafetyError::RollbackFailed { .. } => {
        Some("Restore manually from the backup directory under <workdir>/backups/.".to_string())
      }
    }
  }
}

impl fmt::Display for SafetyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SafetyError::GateBlocked {
        operation_id,
        command,
        detail,
      } => {
        write!(
          f,
          "Operation {} blocked by test gate (`{}` failed)\n{}",
          operation_id, command, detail
        )
      }
      SafetyError::RolledBack { operation_id, reason } => {
        write!(f, "Operation {} failed and was rolled back: {}", operation_id, reason)
      }
      SafetyError::NoBackup { operation_id } => {
        write!(f, "Operation {} has no backup to roll back from", operation_id)
      }
      SafetyError::RollbackFailed {
        operation_id,
        path,
        detail,
      } => {
        write!(
          f,
          "Rollback of operation {} failed at {}: {}",
          operation_id,
          path.display(),
          detail
        )
      }
    }
  }
}

/// Result type alias for warden
pub type WardenResult<T> = Result<T, WardenError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> WardenResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> WardenResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<WardenError>,
{
  fn context(self, ctx: impl Into<String>) -> WardenResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> WardenResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &WardenError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
