//! Cascade propagation of upstream changes
//!
//! When an upstream artifact is accepted with changes, every downstream
//! stage that already has a generated artifact is flagged for re-validation
//! and annotated with a structured change note. Downstream content is never
//! deleted or rewritten here.

use crate::models::{ChangeNote, PhaseState, Stage, WorkflowConfig};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

/// What changed upstream
#[derive(Debug, Clone)]
pub struct ChangeDescriptor {
    pub summary: String,
}

impl ChangeDescriptor {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

/// Stages flagged by a propagation
#[derive(Debug, Clone, Serialize)]
pub struct CascadeOutcome {
    pub updated: Vec<Stage>,
}

/// Flag every stage strictly after `origin` whose artifact exists.
///
/// No-op when nothing downstream has been generated yet.
pub fn propagate(
    state: &mut PhaseState,
    origin: Stage,
    descriptor: &ChangeDescriptor,
    config: &WorkflowConfig,
) -> CascadeOutcome {
    let order = config.stage_order();
    let start = match config.position(origin) {
        Some(pos) => pos + 1,
        None => return CascadeOutcome { updated: Vec::new() },
    };

    let mut updated = Vec::new();
    for stage in &order[start..] {
        if !state.artifact_exists(*stage) {
            continue;
        }
        state.cascade_notes.push(ChangeNote {
            origin,
            affected: *stage,
            summary: descriptor.summary.clone(),
            noted_at: Utc::now(),
        });
        if !state.needs_revalidation.contains(stage) {
            state.needs_revalidation.push(*stage);
        }
        updated.push(*stage);
    }

    if !updated.is_empty() {
        info!(
            phase = %state.phase,
            origin = %origin,
            affected = updated.len(),
            "cascade flagged downstream stages"
        );
    }
    CascadeOutcome { updated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhaseId;

    fn state() -> PhaseState {
        PhaseState::new(PhaseId::parse("06-test").unwrap(), Vec::new())
    }

    #[test]
    fn test_noop_without_downstream_artifacts() {
        let mut state = state();
        state.note_generation(Stage::Spec);

        let outcome = propagate(
            &mut state,
            Stage::Spec,
            &ChangeDescriptor::new("narrowed scope"),
            &WorkflowConfig::default(),
        );
        assert!(outcome.updated.is_empty());
        assert!(state.cascade_notes.is_empty());
        assert!(state.needs_revalidation.is_empty());
    }

    #[test]
    fn test_flags_only_generated_downstream_stages() {
        let config = WorkflowConfig::default();
        let mut state = state();
        state.note_generation(Stage::Spec);
        state.note_generation(Stage::Research);
        state.note_generation(Stage::Plan);
        // tasks never generated

        let outcome = propagate(
            &mut state,
            Stage::Spec,
            &ChangeDescriptor::new("narrowed scope"),
            &config,
        );
        assert_eq!(outcome.updated, vec![Stage::Research, Stage::Plan]);
        assert_eq!(
            state.needs_revalidation,
            vec![Stage::Research, Stage::Plan]
        );
        assert_eq!(state.cascade_notes.len(), 2);
        assert_eq!(state.cascade_notes[0].origin, Stage::Spec);
        assert_eq!(state.cascade_notes[0].summary, "narrowed scope");
    }

    #[test]
    fn test_revalidation_flag_not_duplicated() {
        let config = WorkflowConfig::default();
        let mut state = state();
        state.note_generation(Stage::Research);

        propagate(
            &mut state,
            Stage::Spec,
            &ChangeDescriptor::new("first"),
            &config,
        );
        propagate(
            &mut state,
            Stage::Spec,
            &ChangeDescriptor::new("second"),
            &config,
        );

        assert_eq!(state.needs_revalidation, vec![Stage::Research]);
        // Notes accumulate; flags do not
        assert_eq!(state.cascade_notes.len(), 2);
    }

    #[test]
    fn test_regeneration_clears_flag() {
        let config = WorkflowConfig::default();
        let mut state = state();
        state.note_generation(Stage::Research);
        propagate(
            &mut state,
            Stage::Spec,
            &ChangeDescriptor::new("changed"),
            &config,
        );
        assert_eq!(state.needs_revalidation, vec![Stage::Research]);

        state.note_generation(Stage::Research);
        assert!(state.needs_revalidation.is_empty());
    }
}
