//! Project data sync.
//!
//! The research project list is an opaque JSON array owned by the host. It
//! can be mirrored to a single file in a GitHub repository, exported to and
//! imported from local files, and auto-synced when it changes.

mod github;

pub use github::{GitHubSync, RemoteProjects};

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{CoreError, StorageError, SyncError};
use crate::storage::KvStore;

/// Store key of the local project list.
pub const PROJECTS_KEY: &str = "ml-research-projects";
/// Store key of the [`SyncTracker`].
pub const SYNC_STATE_KEY: &str = "sync-state";

pub const TOKEN_ENV: &str = "LABDESK_GITHUB_TOKEN";
const KEYRING_SERVICE: &str = "labdesk";
const KEYRING_TOKEN_KEY: &str = "github_token";

/// GitHub sync configuration, the `[sync]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// `owner/name`.
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default = "default_file_path")]
    pub file_path: String,
    /// Branch to read and write; the repository default when unset.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_min: u32,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_file_path() -> String {
    "ml-research-projects.json".into()
}
fn default_sync_interval() -> u32 {
    5
}
fn default_api_base() -> String {
    "https://api.github.com".into()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            repo: None,
            file_path: default_file_path(),
            branch: None,
            auto_sync: false,
            sync_interval_min: default_sync_interval(),
            api_base: default_api_base(),
        }
    }
}

impl SyncSettings {
    pub fn is_configured(&self) -> bool {
        self.repo.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// What was last pushed or pulled, for change detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncTracker {
    /// Compact JSON of the last synced project list.
    pub last_synced: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncTracker {
    /// Read the tracker from `store`. A malformed entry reads as a fresh one.
    pub fn load(store: &dyn KvStore) -> Result<Self, StorageError> {
        let Some(raw) = store.get(SYNC_STATE_KEY)? else {
            return Ok(Self::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring malformed sync state");
            Self::default()
        }))
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<(), StorageError> {
        let raw = serde_json::to_string(self).map_err(|e| StorageError::Encode {
            key: SYNC_STATE_KEY.into(),
            message: e.to_string(),
        })?;
        store.set(SYNC_STATE_KEY, &raw)
    }

    pub fn mark_synced(&mut self, projects: &Value, at: DateTime<Utc>) {
        self.last_synced = Some(projects.to_string());
        self.last_sync_at = Some(at);
    }

    /// Without a snapshot, any non-empty list counts as changed.
    pub fn has_unsynced_changes(&self, projects: &Value) -> bool {
        match &self.last_synced {
            Some(snapshot) => projects.to_string() != *snapshot,
            None => projects.as_array().is_some_and(|items| !items.is_empty()),
        }
    }

    /// Whether an automatic push should run at `now`.
    pub fn auto_sync_due(&self, settings: &SyncSettings, projects: &Value, now: DateTime<Utc>) -> bool {
        if !settings.auto_sync || !settings.is_configured() || !self.has_unsynced_changes(projects) {
            return false;
        }
        match self.last_sync_at {
            Some(last) => now - last >= Duration::minutes(i64::from(settings.sync_interval_min)),
            None => true,
        }
    }
}

/// Token from `LABDESK_GITHUB_TOKEN`, else the OS keyring.
pub fn resolve_token() -> Result<Option<String>, SyncError> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.is_empty() {
            return Ok(Some(token));
        }
    }
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_KEY)?;
    match entry.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn store_token(token: &str) -> Result<(), SyncError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_KEY)?;
    entry.set_password(token)?;
    Ok(())
}

pub fn forget_token() -> Result<(), SyncError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_KEY)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Local project list, an empty array when nothing is stored.
pub fn load_projects(store: &dyn KvStore) -> Result<Value, CoreError> {
    match store.get(PROJECTS_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Value::Array(Vec::new())),
    }
}

pub fn save_projects(store: &dyn KvStore, projects: &Value) -> Result<(), CoreError> {
    ensure_array(projects)?;
    store.set(PROJECTS_KEY, &projects.to_string())?;
    Ok(())
}

/// Read a project list from a JSON file. The top level must be an array.
pub fn import_projects(path: &Path) -> Result<Value, CoreError> {
    let raw = std::fs::read_to_string(path)?;
    let projects: Value = serde_json::from_str(&raw)?;
    ensure_array(&projects)?;
    Ok(projects)
}

pub fn export_projects(path: &Path, projects: &Value) -> Result<(), CoreError> {
    let pretty = serde_json::to_string_pretty(projects)?;
    std::fs::write(path, pretty)?;
    Ok(())
}

fn ensure_array(projects: &Value) -> Result<(), SyncError> {
    if projects.is_array() {
        Ok(())
    } else {
        Err(SyncError::InvalidPayload("expected a JSON array of projects".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn configured() -> SyncSettings {
        SyncSettings {
            repo: Some("alice/research".into()),
            auto_sync: true,
            ..SyncSettings::default()
        }
    }

    #[test]
    fn defaults_point_at_github() {
        let settings = SyncSettings::default();
        assert_eq!(settings.file_path, "ml-research-projects.json");
        assert_eq!(settings.api_base, "https://api.github.com");
        assert_eq!(settings.sync_interval_min, 5);
        assert!(!settings.is_configured());
    }

    #[test]
    fn fresh_tracker_counts_non_empty_lists_as_changed() {
        let tracker = SyncTracker::default();
        assert!(!tracker.has_unsynced_changes(&json!([])));
        assert!(tracker.has_unsynced_changes(&json!([{ "id": "1" }])));
    }

    #[test]
    fn tracker_compares_against_snapshot() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let mut tracker = SyncTracker::default();
        let projects = json!([{ "id": "1", "name": "Alpha" }]);
        tracker.mark_synced(&projects, at);

        assert!(!tracker.has_unsynced_changes(&projects));
        assert!(tracker.has_unsynced_changes(&json!([{ "id": "1", "name": "Beta" }])));
        // Clearing the list after a sync is a change too.
        assert!(tracker.has_unsynced_changes(&json!([])));
    }

    #[test]
    fn auto_sync_waits_for_the_interval() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let settings = configured();
        let mut tracker = SyncTracker::default();
        tracker.mark_synced(&json!([]), at);
        let changed = json!([{ "id": "1" }]);

        assert!(!tracker.auto_sync_due(&settings, &changed, at + Duration::minutes(4)));
        assert!(tracker.auto_sync_due(&settings, &changed, at + Duration::minutes(5)));
        assert!(!tracker.auto_sync_due(&settings, &json!([]), at + Duration::minutes(10)));
    }

    #[test]
    fn auto_sync_requires_opt_in_and_repo() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let changed = json!([{ "id": "1" }]);
        let tracker = SyncTracker::default();

        assert!(tracker.auto_sync_due(&configured(), &changed, now));
        let off = SyncSettings {
            auto_sync: false,
            ..configured()
        };
        assert!(!tracker.auto_sync_due(&off, &changed, now));
        let no_repo = SyncSettings {
            repo: None,
            ..configured()
        };
        assert!(!tracker.auto_sync_due(&no_repo, &changed, now));
    }

    #[test]
    fn tracker_round_trips_through_store() {
        let store = MemoryStore::new();
        assert_eq!(SyncTracker::load(&store).unwrap(), SyncTracker::default());

        let mut tracker = SyncTracker::default();
        tracker.mark_synced(&json!([1]), Utc::now());
        tracker.save(&store).unwrap();
        assert_eq!(SyncTracker::load(&store).unwrap(), tracker);

        store.set(SYNC_STATE_KEY, "{oops").unwrap();
        assert_eq!(SyncTracker::load(&store).unwrap(), SyncTracker::default());
    }

    #[test]
    fn projects_default_to_empty_and_must_be_arrays() {
        let store = MemoryStore::new();
        assert_eq!(load_projects(&store).unwrap(), json!([]));

        save_projects(&store, &json!([{ "id": "1" }])).unwrap();
        assert_eq!(load_projects(&store).unwrap(), json!([{ "id": "1" }]));

        let err = save_projects(&store, &json!({ "id": "1" })).unwrap_err();
        assert!(matches!(err, CoreError::Sync(SyncError::InvalidPayload(_))));
    }

    #[test]
    fn export_then_import_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let projects = json!([{ "id": "1", "name": "Alpha" }]);

        export_projects(&path, &projects).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  {"), "export should be pretty-printed");
        assert_eq!(import_projects(&path).unwrap(), projects);
    }

    #[test]
    fn import_rejects_non_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(&path, r#"{"projects": []}"#).unwrap();
        assert!(matches!(
            import_projects(&path),
            Err(CoreError::Sync(SyncError::InvalidPayload(_)))
        ));
    }
}
