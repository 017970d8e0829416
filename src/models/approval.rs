//! Approval records and per-stage bookkeeping slots

use super::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decision recorded for one (phase, stage) slot.
///
/// A new decision overwrites the slot; history survives through the phase's
/// monotonic per-stage iteration counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    /// Whether the stage artifact was signed off
    pub approved: bool,

    /// Identity of the approver (e.g. "reviewer", a username)
    pub approver_id: String,

    /// When the decision was made
    pub decided_at: DateTime<Utc>,

    /// Free-form reviewer comments
    #[serde(default)]
    pub comments: Option<String>,

    /// Structured feedback items, used to drive the next revision
    #[serde(default)]
    pub feedback: Vec<String>,

    /// Iteration counter value at decision time
    pub iteration: u32,
}

/// One nullable approval slot per stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Approvals {
    #[serde(default)]
    pub spec: Option<ApprovalRecord>,
    #[serde(default)]
    pub research: Option<ApprovalRecord>,
    #[serde(default)]
    pub plan: Option<ApprovalRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd: Option<ApprovalRecord>,
    #[serde(default)]
    pub tasks: Option<ApprovalRecord>,
}

impl Approvals {
    pub fn get(&self, stage: Stage) -> Option<&ApprovalRecord> {
        match stage {
            Stage::Spec => self.spec.as_ref(),
            Stage::Research => self.research.as_ref(),
            Stage::Plan => self.plan.as_ref(),
            Stage::Prd => self.prd.as_ref(),
            Stage::Tasks => self.tasks.as_ref(),
        }
    }

    pub fn set(&mut self, stage: Stage, record: ApprovalRecord) {
        let slot = match stage {
            Stage::Spec => &mut self.spec,
            Stage::Research => &mut self.research,
            Stage::Plan => &mut self.plan,
            Stage::Prd => &mut self.prd,
            Stage::Tasks => &mut self.tasks,
        };
        *slot = Some(record);
    }

    pub fn is_approved(&self, stage: Stage) -> bool {
        self.get(stage).map(|r| r.approved).unwrap_or(false)
    }
}

/// Monotonic per-stage iteration counters, starting at 0
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Iterations {
    #[serde(default)]
    pub spec: u32,
    #[serde(default)]
    pub research: u32,
    #[serde(default)]
    pub plan: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd: Option<u32>,
    #[serde(default)]
    pub tasks: u32,
}

impl Iterations {
    pub fn get(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Spec => self.spec,
            Stage::Research => self.research,
            Stage::Plan => self.plan,
            Stage::Prd => self.prd.unwrap_or(0),
            Stage::Tasks => self.tasks,
        }
    }

    pub fn set(&mut self, stage: Stage, value: u32) {
        match stage {
            Stage::Spec => self.spec = value,
            Stage::Research => self.research = value,
            Stage::Plan => self.plan = value,
            Stage::Prd => self.prd = Some(value),
            Stage::Tasks => self.tasks = value,
        }
    }

    pub fn bump(&mut self, stage: Stage) -> u32 {
        let next = self.get(stage) + 1;
        self.set(stage, next);
        next
    }
}
