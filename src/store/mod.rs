//! Durable keyed storage for phase state documents
//!
//! One document per phase id, schema-validated on every load and save, with
//! backup-on-write and corruption detection. The store exclusively owns the
//! persisted bytes; callers work on `PhaseState` values.

pub mod file;
pub mod memory;
pub mod schema;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use crate::error::{PhasedError, Result};
use crate::models::{PhaseId, PhaseState};
use crate::workflow::resolver::suggest_dependencies;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle to one backup snapshot
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupRef {
    /// Storage key of the snapshot (timestamp-suffixed)
    pub key: String,
    pub created: DateTime<Utc>,
}

/// Result of a corruption probe; never an error
#[derive(Debug, Clone, Serialize)]
pub struct CorruptionReport {
    pub corrupted: bool,
    pub errors: Vec<String>,
}

impl CorruptionReport {
    pub fn clean() -> Self {
        Self {
            corrupted: false,
            errors: Vec::new(),
        }
    }

    pub fn corrupt(errors: Vec<String>) -> Self {
        Self {
            corrupted: true,
            errors,
        }
    }
}

/// Keyed storage for phase state documents.
///
/// Injectable so tests and embedders can swap the file-backed store for an
/// in-memory one; nothing in the crate holds a process-wide singleton.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load a phase's state if a document exists. Never synthesizes.
    async fn load_existing(&self, id: &PhaseId) -> Result<Option<PhaseState>>;

    /// Load a phase's state, synthesizing a fresh initial state when no
    /// document exists. Dependencies of a fresh state default to the
    /// numeric-prefix suggestion against the known phase list.
    async fn load(&self, id: &PhaseId) -> Result<PhaseState> {
        if let Some(state) = self.load_existing(id).await? {
            return Ok(state);
        }
        let known = self.list().await.unwrap_or_default();
        Ok(PhaseState::new(
            id.clone(),
            suggest_dependencies(id, &known),
        ))
    }

    /// Validate and persist, backing up the prior version first.
    /// Backup failures never block the save. Stamps `lastModified`.
    async fn save(&self, id: &PhaseId, state: &PhaseState) -> Result<()>;

    /// Snapshot the current document; `None` when no document exists
    async fn backup(&self, id: &PhaseId) -> Result<Option<BackupRef>>;

    /// Restore the most recent parsable snapshot as the primary document
    async fn restore_from_backup(&self, id: &PhaseId) -> Result<PhaseState>;

    /// Probe the persisted document for corruption. Absence is not
    /// corruption; load would synthesize a fresh state.
    async fn detect_corruption(&self, id: &PhaseId) -> CorruptionReport;

    /// All phase ids with a persisted document, ordered by sequence
    async fn list(&self) -> Result<Vec<PhaseId>>;
}

/// Decode a raw document into a `PhaseState`, schema first.
///
/// Any failure is `CorruptState` carrying the structured violations, so a
/// half-parsed object can never escape.
pub(crate) fn decode_document(phase: &PhaseId, document: JsonValue) -> Result<PhaseState> {
    let errors = schema::validate_document(&document);
    if !errors.is_empty() {
        return Err(PhasedError::CorruptState {
            phase: phase.to_string(),
            errors,
        });
    }
    serde_json::from_value(document).map_err(|e| PhasedError::CorruptState {
        phase: phase.to_string(),
        errors: vec![format!("deserialization failed: {}", e)],
    })
}

/// Validate a state for persistence; schema violations are a save-side
/// `Validation` error rather than corruption.
pub(crate) fn encode_document(state: &PhaseState) -> Result<JsonValue> {
    let document = serde_json::to_value(state)?;
    let errors = schema::validate_document(&document);
    if !errors.is_empty() {
        return Err(PhasedError::Validation {
            message: format!("state failed schema validation: {}", errors.join("; ")),
        });
    }
    Ok(document)
}

/// Timestamp format used in backup keys; fixed-width, lexically sortable
pub(crate) const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%9fZ";

/// Build a unique snapshot key. The timestamp dominates the lexical order;
/// the process-wide counter disambiguates snapshots taken within the same
/// instant so no overwrite ever drops a prior snapshot.
pub(crate) fn backup_key(id: &PhaseId, created: DateTime<Utc>) -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}.{}-{:06}.json",
        id,
        created.format(BACKUP_TIMESTAMP_FORMAT),
        seq
    )
}
