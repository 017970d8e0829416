//! Stage-transition validation
//!
//! The workflow is a fixed chain: not-started → spec → research → plan →
//! (prd) → tasks → complete. Approval advances exactly one stage; rejection
//! keeps the stage and bumps its iteration; no stage may be skipped. Status
//! queries always bypass prerequisite checks.

use crate::models::{PhaseState, Stage, WorkflowConfig};
use serde::Serialize;

/// Result of asking whether a transition is legal
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub valid: bool,
    pub missing_prerequisites: Vec<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Transition {
    fn allowed() -> Self {
        Self {
            valid: true,
            missing_prerequisites: Vec::new(),
            reason: None,
        }
    }
}

/// The next legal action on a phase
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "action", content = "stage")]
pub enum NextAction {
    /// Generate (or regenerate) the stage artifact
    Generate(Stage),
    /// Artifact exists and awaits a decision
    Approve(Stage),
    /// Every stage is approved
    Complete,
}

/// The stages strictly before `stage` in the active order
pub fn precedent_chain(stage: Stage, config: &WorkflowConfig) -> &'static [Stage] {
    let order = config.stage_order();
    match config.position(stage) {
        Some(pos) => &order[..pos],
        None => &[],
    }
}

/// Whether work on `target` may begin: every precedent stage must be
/// approved.
pub fn can_transition(state: &PhaseState, target: Stage, config: &WorkflowConfig) -> Transition {
    if !config.includes(target) {
        return Transition {
            valid: false,
            missing_prerequisites: Vec::new(),
            reason: Some(format!(
                "stage '{}' is not part of the configured workflow",
                target
            )),
        };
    }

    let missing: Vec<Stage> = precedent_chain(target, config)
        .iter()
        .copied()
        .filter(|s| !state.approvals.is_approved(*s))
        .collect();

    if missing.is_empty() {
        Transition::allowed()
    } else {
        let names: Vec<&str> = missing.iter().map(|s| s.name()).collect();
        Transition {
            valid: false,
            missing_prerequisites: missing,
            reason: Some(format!(
                "'{}' requires approval of: {}",
                target,
                names.join(", ")
            )),
        }
    }
}

/// Recompute the next legal action from the approval slots.
///
/// A rejected current stage needs regeneration; an undecided one with an
/// artifact awaits approval; otherwise generate it.
pub fn next_action(state: &PhaseState, config: &WorkflowConfig) -> NextAction {
    let Some(current) = state.current_step else {
        return NextAction::Complete;
    };
    match state.approvals.get(current) {
        Some(record) if !record.approved => NextAction::Generate(current),
        _ if state.artifact_exists(current) => NextAction::Approve(current),
        _ => NextAction::Generate(current),
    }
}
