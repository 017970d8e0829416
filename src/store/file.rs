//! File-backed state store
//!
//! Layout under the store root:
//!   state/<phase-id>.json                     primary documents
//!   backups/<phase-id>.<utc-timestamp>-<seq>.json   snapshots, newest-first lookup

use super::{backup_key, decode_document, encode_document, BackupRef, CorruptionReport, StateStore};
use crate::error::{PhasedError, Result};
use crate::models::{PhaseId, PhaseState};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    fn state_path(&self, id: &PhaseId) -> PathBuf {
        self.state_dir().join(format!("{}.json", id))
    }

    /// Raw document bytes, `Ok(None)` when no document exists
    async fn read_raw(&self, id: &PhaseId) -> Result<Option<String>> {
        match fs::read_to_string(self.state_path(id)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Backup keys for a phase, newest first
    async fn backup_keys(&self, id: &PhaseId) -> Result<Vec<String>> {
        let prefix = format!("{}.", id);
        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(self.backups_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(".json") {
                keys.push(name);
            }
        }
        // Timestamp suffixes sort lexically; newest first
        keys.sort_by(|a, b| b.cmp(a));
        Ok(keys)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load_existing(&self, id: &PhaseId) -> Result<Option<PhaseState>> {
        let Some(content) = self.read_raw(id).await? else {
            return Ok(None);
        };
        let document: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| PhasedError::CorruptState {
                phase: id.to_string(),
                errors: vec![format!("unparsable JSON: {}", e)],
            })?;
        decode_document(id, document).map(Some)
    }

    async fn save(&self, id: &PhaseId, state: &PhaseState) -> Result<()> {
        let mut stamped = state.clone();
        stamped.metadata.last_modified = Utc::now();
        let document = encode_document(&stamped)?;

        if let Err(e) = self.backup(id).await {
            warn!(phase = %id, error = %e, "backup before save failed; continuing");
        }

        fs::create_dir_all(self.state_dir()).await?;
        let content = serde_json::to_string_pretty(&document)?;
        fs::write(self.state_path(id), content).await?;
        debug!(phase = %id, "state saved");
        Ok(())
    }

    async fn backup(&self, id: &PhaseId) -> Result<Option<BackupRef>> {
        let Some(content) = self.read_raw(id).await? else {
            return Ok(None);
        };
        let created = Utc::now();
        let key = backup_key(id, created);
        fs::create_dir_all(self.backups_dir()).await?;
        fs::write(self.backups_dir().join(&key), content).await?;
        debug!(phase = %id, key = %key, "backup written");
        Ok(Some(BackupRef { key, created }))
    }

    async fn restore_from_backup(&self, id: &PhaseId) -> Result<PhaseState> {
        for key in self.backup_keys(id).await? {
            let path = self.backups_dir().join(&key);
            let Ok(content) = fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(document) = serde_json::from_str::<serde_json::Value>(&content) else {
                debug!(phase = %id, key = %key, "skipping unparsable snapshot");
                continue;
            };
            match decode_document(id, document) {
                Ok(state) => {
                    fs::create_dir_all(self.state_dir()).await?;
                    fs::write(self.state_path(id), &content).await?;
                    debug!(phase = %id, key = %key, "restored from backup");
                    return Ok(state);
                }
                Err(_) => {
                    debug!(phase = %id, key = %key, "skipping schema-invalid snapshot");
                    continue;
                }
            }
        }
        Err(PhasedError::Recovery {
            phase: id.to_string(),
        })
    }

    async fn detect_corruption(&self, id: &PhaseId) -> CorruptionReport {
        let content = match self.read_raw(id).await {
            Ok(Some(content)) => content,
            Ok(None) => return CorruptionReport::clean(),
            Err(e) => return CorruptionReport::corrupt(vec![format!("read failed: {}", e)]),
        };
        let document: serde_json::Value = match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => return CorruptionReport::corrupt(vec![format!("unparsable JSON: {}", e)]),
        };
        let errors = super::schema::validate_document(&document);
        if errors.is_empty() {
            CorruptionReport::clean()
        } else {
            CorruptionReport::corrupt(errors)
        }
    }

    async fn list(&self) -> Result<Vec<PhaseId>> {
        let mut ids = Vec::new();
        let mut entries = match fs::read_dir(self.state_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix(".json") {
                if let Ok(id) = PhaseId::parse(stem) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
