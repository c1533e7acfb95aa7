//! CLI commands for warden
//!
//! - **analyze**: run the analyzer set and print the issue report
//! - **fix**: preview or transactionally apply automatic fixes
//! - **graph**: inspect the import graph and circular dependencies
//! - **rollback**: restore an operation's files from its backup

pub mod analyze;
pub mod fix;
pub mod graph;
pub mod rollback;

pub use analyze::run_analyze;
pub use fix::run_fix;
pub use graph::run_graph;
pub use rollback::run_rollback;
