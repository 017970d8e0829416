//! Phase state: the one persisted document per phase
//!
//! `PhaseState` is a value object. Components receive it by reference or
//! mutate a loaded copy; every durable mutation is a load → mutate → save
//! round-trip through the router. `completedSteps` and `currentStep` are
//! derived from the approval slots and recomputed after every mutation.

use super::{Approvals, Iterations, PhaseId, Stage, WorkflowConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into new documents
pub const STATE_VERSION: &str = "1.0";

/// Why a phase is blocked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockerKind {
    /// A declared dependency phase has not completed
    Dependency,
    /// A stage is waiting on sign-off
    Approval,
    /// Anything outside the workflow's control
    External,
}

/// An open blocker on a phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub kind: BlockerKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub created_at: DateTime<Utc>,
}

impl Blocker {
    pub fn dependency(description: impl Into<String>) -> Self {
        Self {
            kind: BlockerKind::Dependency,
            description: description.into(),
            stage: None,
            created_at: Utc::now(),
        }
    }
}

/// Structured note appended when an upstream change cascades downstream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNote {
    /// Stage whose artifact changed
    pub origin: Stage,
    /// Downstream stage flagged for re-validation
    pub affected: Stage,
    /// What changed upstream
    pub summary: String,
    pub noted_at: DateTime<Utc>,
}

/// Document metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Schema version of this document
    pub version: String,
}

/// Full state of one phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseState {
    /// Phase identifier (`NN-slug`)
    pub phase: PhaseId,

    /// Human-readable title
    pub phase_title: String,

    /// First not-yet-approved stage, or null once every stage is approved
    pub current_step: Option<Stage>,

    /// Approved stages, always a prefix of the canonical order
    pub completed_steps: Vec<Stage>,

    /// Per-stage approval slots
    #[serde(default)]
    pub approvals: Approvals,

    /// Per-stage iteration counters
    #[serde(default)]
    pub iterations: Iterations,

    /// Open blockers
    #[serde(default)]
    pub blockers: Vec<Blocker>,

    /// Declared prerequisite phases (authoritative list)
    #[serde(default)]
    pub dependencies: Vec<PhaseId>,

    /// Cascade notes appended when upstream artifacts change
    #[serde(default)]
    pub cascade_notes: Vec<ChangeNote>,

    /// Downstream stages flagged for re-validation by a cascade
    #[serde(default)]
    pub needs_revalidation: Vec<Stage>,

    pub metadata: Metadata,
}

impl PhaseState {
    /// Fresh initial state: first stage pending, nothing approved
    pub fn new(phase: PhaseId, dependencies: Vec<PhaseId>) -> Self {
        let now = Utc::now();
        let phase_title = phase.default_title();
        Self {
            phase,
            phase_title,
            current_step: Some(Stage::Spec),
            completed_steps: Vec::new(),
            approvals: Approvals::default(),
            iterations: Iterations::default(),
            blockers: Vec::new(),
            dependencies,
            cascade_notes: Vec::new(),
            needs_revalidation: Vec::new(),
            metadata: Metadata {
                created: now,
                last_modified: now,
                version: STATE_VERSION.to_string(),
            },
        }
    }

    /// Recompute `completedSteps` and `currentStep` from the approval slots.
    ///
    /// `completedSteps` is the longest approved prefix of the active order;
    /// an approval recorded out of order does not enter it.
    pub fn recompute_derived(&mut self, config: &WorkflowConfig) {
        let order = config.stage_order();
        let mut completed = Vec::new();
        for stage in order {
            if self.approvals.is_approved(*stage) {
                completed.push(*stage);
            } else {
                break;
            }
        }
        self.current_step = order.get(completed.len()).copied();
        self.completed_steps = completed;
    }

    /// Whether all stages are approved
    pub fn is_complete(&self, config: &WorkflowConfig) -> bool {
        self.completed_steps.len() == config.stage_order().len()
    }

    /// Completion percentage over the active stage chain
    pub fn progress(&self, config: &WorkflowConfig) -> u8 {
        let total = config.stage_order().len();
        ((self.completed_steps.len() * 100) / total) as u8
    }

    /// A stage has a generated artifact once its counter has moved
    pub fn artifact_exists(&self, stage: Stage) -> bool {
        self.iterations.get(stage) > 0
    }

    /// Bookkeeping for a (re)generation of a stage artifact.
    ///
    /// A rejection already reserved the next iteration number, so
    /// regenerating after a rejection keeps the counter; any other
    /// generation advances it. Regeneration also clears the stage's
    /// re-validation flag.
    pub fn note_generation(&mut self, stage: Stage) -> u32 {
        let rejected = self
            .approvals
            .get(stage)
            .map(|r| !r.approved)
            .unwrap_or(false);
        if !rejected {
            self.iterations.bump(stage);
        }
        self.needs_revalidation.retain(|s| *s != stage);
        self.iterations.get(stage).max(1)
    }

    /// Replace the dependency-kind blockers with one per missing phase
    pub fn set_dependency_blockers(&mut self, missing: &[PhaseId]) {
        self.blockers.retain(|b| b.kind != BlockerKind::Dependency);
        for id in missing {
            self.blockers.push(Blocker::dependency(format!(
                "dependency phase '{}' has not completed its workflow",
                id
            )));
        }
    }
}
