// src/backup/state.rs
//! Change-detection state for incremental backups.
//!
//! One JSON file per backup directory records, for every exported page
//! and database, the last edited timestamp and a SHA-256 of the
//! rendered content. Change detection is a fast timestamp comparison
//! with an optional content-hash check behind it.

use crate::constants::{STATE_FILE_NAME, STATE_SCHEMA_VERSION};
use crate::error::AppError;
use crate::output::{atomic_write, safe_mkdir};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Recorded state of one exported page (or database schema).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageState {
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub attachment_hashes: BTreeMap<String, String>,
    #[serde(default)]
    pub backed_up_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default = "default_version")]
    version: u64,
    #[serde(default)]
    saved_at: String,
    #[serde(default)]
    pages: BTreeMap<String, PageState>,
    #[serde(default)]
    databases: BTreeMap<String, PageState>,
}

fn default_version() -> u64 {
    STATE_SCHEMA_VERSION
}

/// In-memory view of the state file, loaded on open and written back
/// once per run.
pub struct BackupState {
    state_path: PathBuf,
    pages: BTreeMap<String, PageState>,
    databases: BTreeMap<String, PageState>,
}

impl BackupState {
    /// Open (or initialize) the state store under `state_dir`.
    ///
    /// A missing file means a fresh store. A malformed file or a
    /// version mismatch is logged and treated as fresh rather than
    /// failing the run; the next save rewrites it.
    pub fn open(state_dir: &std::path::Path) -> Result<Self, AppError> {
        let state_dir = safe_mkdir(state_dir)?;
        let state_path = state_dir.join(STATE_FILE_NAME);

        let mut state = Self {
            state_path,
            pages: BTreeMap::new(),
            databases: BTreeMap::new(),
        };

        if !state.state_path.exists() {
            log::debug!("No existing state file found");
            return Ok(state);
        }

        match std::fs::read_to_string(&state.state_path) {
            Ok(raw) => match serde_json::from_str::<StateFile>(&raw) {
                Ok(file) if file.version == STATE_SCHEMA_VERSION => {
                    state.pages = file.pages;
                    state.databases = file.databases;
                    log::debug!(
                        "Loaded state: {} pages, {} databases",
                        state.pages.len(),
                        state.databases.len(),
                    );
                }
                Ok(file) => {
                    log::warn!(
                        "State file version mismatch (got {}, expected {}), starting fresh",
                        file.version,
                        STATE_SCHEMA_VERSION,
                    );
                }
                Err(e) => {
                    log::warn!("Failed to load state file: {}", e);
                }
            },
            Err(e) => {
                log::warn!("Failed to load state file: {}", e);
            }
        }

        Ok(state)
    }

    /// Write the state back to disk atomically.
    pub fn save(&self) -> Result<(), AppError> {
        let file = StateFile {
            version: STATE_SCHEMA_VERSION,
            saved_at: utc_now(),
            pages: self.pages.clone(),
            databases: self.databases.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        atomic_write(&self.state_path, content.as_bytes())?;
        log::debug!(
            "Saved state: {} pages, {} databases",
            self.pages.len(),
            self.databases.len(),
        );
        Ok(())
    }

    /// Whether a page must be re-exported.
    ///
    /// The timestamp comparison decides for known pages; when rendered
    /// content is supplied, a hash mismatch also forces a backup.
    pub fn needs_backup(
        &self,
        page_id: &str,
        last_edited_time: &str,
        content: Option<&str>,
    ) -> bool {
        let Some(state) = self.pages.get(page_id) else {
            log::debug!("Page {} is new, needs backup", short(page_id));
            return true;
        };

        if state.last_edited_time != last_edited_time {
            log::debug!("Page {} timestamp changed, needs backup", short(page_id));
            return true;
        }

        if let Some(content) = content {
            if state.content_hash != compute_hash(content) {
                log::debug!("Page {} content hash changed, needs backup", short(page_id));
                return true;
            }
        }

        log::debug!("Page {} unchanged, skipping", short(page_id));
        false
    }

    pub fn update_page(
        &mut self,
        page_id: &str,
        last_edited_time: &str,
        content: &str,
        attachment_hashes: BTreeMap<String, String>,
    ) {
        self.pages.insert(
            page_id.to_string(),
            PageState {
                last_edited_time: last_edited_time.to_string(),
                content_hash: compute_hash(content),
                attachment_hashes,
                backed_up_at: utc_now(),
            },
        );
    }

    pub fn update_database(&mut self, database_id: &str, last_edited_time: &str, schema: &str) {
        self.databases.insert(
            database_id.to_string(),
            PageState {
                last_edited_time: last_edited_time.to_string(),
                content_hash: compute_hash(schema),
                attachment_hashes: BTreeMap::new(),
                backed_up_at: utc_now(),
            },
        );
    }

    pub fn get_page_state(&self, page_id: &str) -> Option<&PageState> {
        self.pages.get(page_id)
    }

    pub fn get_database_state(&self, database_id: &str) -> Option<&PageState> {
        self.databases.get(database_id)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn database_count(&self) -> usize {
        self.databases.len()
    }

    /// Most recent `backed_up_at` across all tracked documents.
    pub fn last_backup_time(&self) -> Option<String> {
        self.pages
            .values()
            .chain(self.databases.values())
            .map(|s| s.backed_up_at.as_str())
            .filter(|t| !t.is_empty())
            .max()
            .map(String::from)
    }
}

/// `"sha256:"` plus the lowercase hex digest of the content.
pub fn compute_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("sha256:{:x}", digest)
}

fn utc_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn short(id: &str) -> &str {
    &id[..id.len().min(8)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn new_page_needs_backup() {
        let dir = tempdir().unwrap();
        let state = BackupState::open(dir.path()).unwrap();
        assert!(state.needs_backup("page-1", "2025-01-01T00:00:00Z", None));
    }

    #[test]
    fn unchanged_page_is_skipped() {
        let dir = tempdir().unwrap();
        let mut state = BackupState::open(dir.path()).unwrap();
        state.update_page("page-1", "2025-01-01T00:00:00Z", "body", BTreeMap::new());

        assert!(!state.needs_backup("page-1", "2025-01-01T00:00:00Z", None));
        assert!(!state.needs_backup("page-1", "2025-01-01T00:00:00Z", Some("body")));
    }

    #[test]
    fn timestamp_change_forces_backup() {
        let dir = tempdir().unwrap();
        let mut state = BackupState::open(dir.path()).unwrap();
        state.update_page("page-1", "2025-01-01T00:00:00Z", "body", BTreeMap::new());

        assert!(state.needs_backup("page-1", "2025-01-02T00:00:00Z", None));
    }

    #[test]
    fn content_hash_catches_silent_change() {
        let dir = tempdir().unwrap();
        let mut state = BackupState::open(dir.path()).unwrap();
        state.update_page("page-1", "2025-01-01T00:00:00Z", "body", BTreeMap::new());

        // Same timestamp but different rendered content.
        assert!(state.needs_backup("page-1", "2025-01-01T00:00:00Z", Some("edited body")));
    }

    #[test]
    fn state_survives_save_and_reload() {
        let dir = tempdir().unwrap();
        let mut state = BackupState::open(dir.path()).unwrap();
        let mut hashes = BTreeMap::new();
        hashes.insert("img.png".to_string(), compute_hash("bytes"));
        state.update_page("page-1", "2025-01-01T00:00:00Z", "body", hashes);
        state.update_database("db-1", "2025-01-03T00:00:00Z", "schema");
        state.save().unwrap();

        let reloaded = BackupState::open(dir.path()).unwrap();
        assert_eq!(reloaded.page_count(), 1);
        assert_eq!(reloaded.database_count(), 1);
        assert!(!reloaded.needs_backup("page-1", "2025-01-01T00:00:00Z", Some("body")));
        let db = reloaded.get_database_state("db-1").unwrap();
        assert_eq!(db.last_edited_time, "2025-01-03T00:00:00Z");
    }

    #[test]
    fn version_mismatch_starts_fresh() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(STATE_FILE_NAME),
            r#"{"version": 999, "pages": {"page-1": {"last_edited_time": "t"}}}"#,
        )
        .unwrap();

        let state = BackupState::open(dir.path()).unwrap();
        assert_eq!(state.page_count(), 0);
        assert!(state.needs_backup("page-1", "t", None));
    }

    #[test]
    fn malformed_file_starts_fresh() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE_NAME), "not json {").unwrap();

        let state = BackupState::open(dir.path()).unwrap();
        assert_eq!(state.page_count(), 0);
    }

    #[test]
    fn hash_is_prefixed_sha256_hex() {
        let hash = compute_hash("hello");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), "sha256:".len() + 64);
        assert_eq!(hash, compute_hash("hello"));
        assert_ne!(hash, compute_hash("hello "));
    }
}
