//! Safety layer: change sets, the test gate, and the transactional manager

pub mod changes;
pub mod manager;
pub mod test_gate;

pub use changes::{ChangeKind, FileChange};
pub use manager::{Operation, OperationState, SafetyManager};
pub use test_gate::{CommandGate, Gate, GateOutcome, StaticGate};
