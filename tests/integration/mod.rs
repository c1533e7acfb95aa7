//! Integration tests for the warden CLI

mod helpers;
mod test_analyze;
mod test_fix;
mod test_graph;
mod test_rollback;
