//! Core building blocks shared by the analysis and safety layers:
//!
//! - **config**: warden.yml parsing and validation
//! - **error**: categorized error types with contextual help messages
//! - **files**: file scanning and immutable `FileRecord` snapshots

pub mod config;
pub mod error;
pub mod files;
