//! Stage-generator collaborator interface
//!
//! Generating the actual artifact content is outside this crate; the router
//! only consumes a reference to the produced artifact and a flag saying
//! whether downstream artifacts are impacted.

use crate::models::{PhaseId, PhaseState, Stage};
use async_trait::async_trait;

/// Free-form payload forwarded to the generator
#[derive(Debug, Clone, Default)]
pub struct StagePayload {
    /// Request body / instructions for the artifact
    pub body: Option<String>,
    /// Change description, present when revising an accepted artifact
    pub changes: Option<String>,
}

/// What a generator produced
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    /// Opaque reference to the artifact (path, URL, document id)
    pub artifact_ref: String,
    /// Whether downstream artifacts must be re-validated
    pub cascade_needed: bool,
}

#[async_trait]
pub trait StageGenerator: Send + Sync {
    async fn generate(
        &self,
        phase: &PhaseId,
        state: &PhaseState,
        stage: Stage,
        payload: &StagePayload,
    ) -> anyhow::Result<GeneratedArtifact>;
}

/// Default generator: hands back a deterministic artifact reference and
/// signals a cascade whenever the payload carries a change description.
/// Useful for the CLI, where artifacts are authored externally.
pub struct ReferenceGenerator;

#[async_trait]
impl StageGenerator for ReferenceGenerator {
    async fn generate(
        &self,
        phase: &PhaseId,
        _state: &PhaseState,
        stage: Stage,
        payload: &StagePayload,
    ) -> anyhow::Result<GeneratedArtifact> {
        Ok(GeneratedArtifact {
            artifact_ref: format!("{}/{}.md", phase, stage),
            cascade_needed: payload.changes.is_some(),
        })
    }
}
