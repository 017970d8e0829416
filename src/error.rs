//! Error taxonomy for the workflow engine
//!
//! Every failure reaching the router boundary is normalized into a response
//! envelope; `PhasedError::kind` supplies the stable `errorKind` string.

use crate::models::Stage;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PhasedError>;

#[derive(Debug, Error)]
pub enum PhasedError {
    /// Malformed command, phase id or payload
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Illegal stage transition; carries what must be approved first
    #[error("cannot run '{target}' for phase '{phase}': approve {} first", format_stages(.required_steps))]
    Workflow {
        phase: String,
        target: Stage,
        current: Option<Stage>,
        required_steps: Vec<Stage>,
    },

    /// Later-stage change conflicts with an unapproved precedent
    #[error("change to '{stage}' in phase '{phase}' conflicts with unapproved precedent {}", format_stages(.unmet))]
    Hierarchy {
        phase: String,
        stage: Stage,
        unmet: Vec<Stage>,
    },

    /// Declared dependency phases have not completed their workflow
    #[error("phase '{phase}' has unmet dependencies: {}", .missing.join(", "))]
    UnmetDependencies { phase: String, missing: Vec<String> },

    /// Persisted document is unparsable or schema-invalid
    #[error("state for phase '{phase}' is corrupt: {}", .errors.join("; "))]
    CorruptState { phase: String, errors: Vec<String> },

    /// No usable backup snapshot exists
    #[error("no usable backup found for phase '{phase}'")]
    Recovery { phase: String },

    /// Stage-generator collaborator failed
    #[error("stage generator failed: {0}")]
    Generator(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn format_stages(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PhasedError {
    /// Stable kind string surfaced in the router envelope
    pub fn kind(&self) -> &'static str {
        match self {
            PhasedError::Validation { .. } => "ValidationError",
            PhasedError::Workflow { .. } => "WorkflowError",
            PhasedError::Hierarchy { .. } => "HierarchicalViolation",
            PhasedError::UnmetDependencies { .. } => "WorkflowError",
            PhasedError::CorruptState { .. } => "CorruptState",
            PhasedError::Recovery { .. } => "RecoveryError",
            PhasedError::Generator(_) => "GeneratorError",
            PhasedError::Io(_) => "IoError",
            PhasedError::Serde(_) => "SerializationError",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PhasedError::Validation {
            message: message.into(),
        }
    }
}
