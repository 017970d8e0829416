//! Approval tracking per (phase, stage)
//!
//! Records decisions and keeps the per-stage iteration counters honest. It
//! deliberately knows nothing about stage ordering; the workflow validator
//! enforces that, which keeps this component independently testable.

use crate::models::{ApprovalRecord, PhaseState, Stage};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Input to an approval decision
#[derive(Debug, Clone)]
pub struct Decision {
    pub approved: bool,
    pub approver_id: String,
    pub comments: Option<String>,
    pub feedback: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Approved,
    NeedsRevision,
}

/// What a recorded decision produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub record: ApprovalRecord,
    pub status: DecisionStatus,
    /// Revision round to produce next; set on rejection only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_iteration: Option<u32>,
}

/// Read-only projection of a stage's approval state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageApprovalStatus {
    pub stage: Stage,
    pub approved: bool,
    pub iteration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    pub feedback: Vec<String>,
}

/// Record a decision on a stage, overwriting the slot.
///
/// The record carries the iteration counter value at decision time (a
/// never-generated stage counts as iteration 1). A rejection advances the
/// counter so the revision round is already numbered; an approval leaves it,
/// which is what lets a revised artifact be approved at the iteration the
/// rejection reserved.
pub fn record_decision(state: &mut PhaseState, stage: Stage, decision: Decision) -> DecisionOutcome {
    if state.iterations.get(stage) == 0 {
        state.iterations.set(stage, 1);
    }
    let iteration = state.iterations.get(stage);

    let record = ApprovalRecord {
        approved: decision.approved,
        approver_id: decision.approver_id,
        decided_at: Utc::now(),
        comments: decision.comments,
        feedback: decision.feedback,
        iteration,
    };
    state.approvals.set(stage, record.clone());

    if decision.approved {
        DecisionOutcome {
            record,
            status: DecisionStatus::Approved,
            next_iteration: None,
        }
    } else {
        state.iterations.bump(stage);
        DecisionOutcome {
            record,
            status: DecisionStatus::NeedsRevision,
            next_iteration: Some(iteration + 1),
        }
    }
}

/// Read-only approval status for a stage
pub fn status(state: &PhaseState, stage: Stage) -> StageApprovalStatus {
    let record = state.approvals.get(stage);
    StageApprovalStatus {
        stage,
        approved: record.map(|r| r.approved).unwrap_or(false),
        iteration: state.iterations.get(stage),
        approver_id: record.map(|r| r.approver_id.clone()),
        decided_at: record.map(|r| r.decided_at),
        feedback: record.map(|r| r.feedback.clone()).unwrap_or_default(),
    }
}
