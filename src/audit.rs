//! Audit hook for sensitive mutations
//!
//! Fired before persisting when an already-approved tasks artifact is
//! affected again; carries the backup reference so the pre-change document
//! can be located.

use crate::models::{PhaseId, Stage};
use crate::store::BackupRef;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// One structured audit entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub phase: PhaseId,
    pub stage: Stage,
    /// Command that triggered the entry
    pub action: String,
    /// Snapshot of the document before the mutation, if one existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupRef>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        phase: PhaseId,
        stage: Stage,
        action: impl Into<String>,
        backup: Option<BackupRef>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase,
            stage,
            action: action.into(),
            backup,
            at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry);
}

/// Default sink: emits the entry on the `phased::audit` tracing target
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) {
        info!(
            target: "phased::audit",
            id = %entry.id,
            phase = %entry.phase,
            stage = %entry.stage,
            action = %entry.action,
            backup = entry.backup.as_ref().map(|b| b.key.as_str()),
            "audit entry"
        );
    }
}
