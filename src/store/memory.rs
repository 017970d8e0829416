//! In-memory state store for tests and embedding
//!
//! Holds raw JSON documents so tests can inject corrupt payloads and observe
//! the same decode path the file store uses.

use super::{backup_key, decode_document, encode_document, BackupRef, CorruptionReport, StateStore};
use crate::error::{PhasedError, Result};
use crate::models::{PhaseId, PhaseState};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStateStore {
    documents: Mutex<HashMap<String, JsonValue>>,
    backups: Mutex<HashMap<String, Vec<(BackupRef, JsonValue)>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a state directly, bypassing schema validation
    pub fn insert(&self, state: &PhaseState) {
        let document = serde_json::to_value(state).expect("state serializes");
        self.documents
            .lock()
            .unwrap()
            .insert(state.phase.to_string(), document);
    }

    /// Seed a raw document, e.g. a deliberately corrupt one
    pub fn insert_raw(&self, id: &PhaseId, document: JsonValue) {
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), document);
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_existing(&self, id: &PhaseId) -> Result<Option<PhaseState>> {
        let document = self.documents.lock().unwrap().get(&id.to_string()).cloned();
        match document {
            Some(doc) => decode_document(id, doc).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &PhaseId, state: &PhaseState) -> Result<()> {
        let mut stamped = state.clone();
        stamped.metadata.last_modified = Utc::now();
        let document = encode_document(&stamped)?;
        let _ = self.backup(id).await;
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn backup(&self, id: &PhaseId) -> Result<Option<BackupRef>> {
        let document = self.documents.lock().unwrap().get(&id.to_string()).cloned();
        let Some(document) = document else {
            return Ok(None);
        };
        let created = Utc::now();
        let backup = BackupRef {
            key: backup_key(id, created),
            created,
        };
        self.backups
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push((backup.clone(), document));
        Ok(Some(backup))
    }

    async fn restore_from_backup(&self, id: &PhaseId) -> Result<PhaseState> {
        let snapshots = self
            .backups
            .lock()
            .unwrap()
            .get(&id.to_string())
            .cloned()
            .unwrap_or_default();
        for (_, document) in snapshots.iter().rev() {
            if let Ok(state) = decode_document(id, document.clone()) {
                self.documents
                    .lock()
                    .unwrap()
                    .insert(id.to_string(), document.clone());
                return Ok(state);
            }
        }
        Err(PhasedError::Recovery {
            phase: id.to_string(),
        })
    }

    async fn detect_corruption(&self, id: &PhaseId) -> CorruptionReport {
        let document = self.documents.lock().unwrap().get(&id.to_string()).cloned();
        match document {
            None => CorruptionReport::clean(),
            Some(doc) => {
                let errors = super::schema::validate_document(&doc);
                if errors.is_empty() {
                    CorruptionReport::clean()
                } else {
                    CorruptionReport::corrupt(errors)
                }
            }
        }
    }

    async fn list(&self) -> Result<Vec<PhaseId>> {
        let mut ids: Vec<PhaseId> = self
            .documents
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| PhaseId::parse(k).ok())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
