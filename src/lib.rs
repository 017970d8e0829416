// Phased - Staged Document-Approval Workflow Coordinator
// A persistent state machine for spec → research → plan → tasks sign-off

pub mod audit;
pub mod cli;
pub mod error;
pub mod generator;
pub mod models;
pub mod router;
pub mod store;
pub mod workflow;

pub use error::{PhasedError, Result};

// Re-export commonly used types
pub use generator::{GeneratedArtifact, ReferenceGenerator, StageGenerator, StagePayload};
pub use models::{PhaseId, PhaseState, Stage, WorkflowConfig};
pub use router::{ApprovalRequest, Command, CommandOptions, Envelope, Router};
pub use store::{BackupRef, FileStateStore, MemoryStateStore, StateStore};
