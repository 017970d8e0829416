//! Workflow configuration

use super::Stage;
use serde::{Deserialize, Serialize};

const ORDER_DEFAULT: &[Stage] = &[Stage::Spec, Stage::Research, Stage::Plan, Stage::Tasks];
const ORDER_WITH_PRD: &[Stage] = &[
    Stage::Spec,
    Stage::Research,
    Stage::Plan,
    Stage::Prd,
    Stage::Tasks,
];

/// How declared dependency phases gate the first stage of a phase.
///
/// Later stages are gated by their precedent documents either way; this only
/// decides whether `spec` generation is blocked on unresolved dependencies or
/// merely annotated with them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DependencyGate {
    /// Unresolved dependencies fail the command
    Enforce,
    /// Unresolved dependencies are recorded as blockers but do not fail
    #[default]
    Informational,
}

/// Tunable workflow behavior shared by validator, cascade and router
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Insert the optional `prd` stage between `plan` and `tasks`
    #[serde(default)]
    pub include_prd: bool,

    /// Dependency gating policy for the first stage
    #[serde(default)]
    pub dependency_gate: DependencyGate,
}

impl WorkflowConfig {
    /// The active stage chain, in canonical order
    pub fn stage_order(&self) -> &'static [Stage] {
        if self.include_prd {
            ORDER_WITH_PRD
        } else {
            ORDER_DEFAULT
        }
    }

    /// Whether a stage participates in the active chain
    pub fn includes(&self, stage: Stage) -> bool {
        self.stage_order().contains(&stage)
    }

    /// Position of a stage in the active chain
    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.stage_order().iter().position(|s| *s == stage)
    }
}
