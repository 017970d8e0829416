pub mod approval;
pub mod config;
pub mod phase;
pub mod phase_id;
pub mod stage;

pub use approval::{ApprovalRecord, Approvals, Iterations};
pub use config::{DependencyGate, WorkflowConfig};
pub use phase::{Blocker, BlockerKind, ChangeNote, Metadata, PhaseState};
pub use phase_id::PhaseId;
pub use stage::Stage;
