//! Credential persistence for the device/session records.
//!
//! A single JSON file holds the stable device id, the short-lived grant
//! code, the session expiry and the selected profile's favorites payload.
//! Saves are merge-then-overwrite: a field the caller does not supply keeps
//! its stored value, so partial updates cannot null out unrelated fields.
//! No file locking; the host invokes one process at a time.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::errors::VueError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub device_id: String,
    pub code: Option<String>,
    /// ISO-8601 timestamp, kept as the raw string the vendor returned
    pub expiry_date: String,
    pub profile_data: Option<serde_json::Value>,
}

impl Credentials {
    /// A fresh device record: new device id, no grant code, expiry in the
    /// past so the next session check forces a login.
    pub fn bootstrap() -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            code: None,
            // Already expired, so a fresh install always runs the login flow
            expiry_date: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            profile_data: None,
        }
    }

    /// Whether the stored expiry is still in the future at `now`.
    /// An unparseable expiry counts as expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match parse_iso8601(&self.expiry_date) {
            Some(expiry) => expiry > now,
            None => false,
        }
    }
}

/// Parse an ISO-8601 timestamp, with or without a UTC offset.
/// Offset-less timestamps are taken as UTC, matching the vendor API.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Fields to change in a [`CredentialStore::save`] call; `None` keeps the
/// stored value.
#[derive(Debug, Default, Clone)]
pub struct CredentialUpdate {
    pub device_id: Option<String>,
    pub code: Option<String>,
    pub expiry_date: Option<String>,
    pub profile_data: Option<serde_json::Value>,
}

pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(save_path: &Path) -> Self {
        Self {
            path: save_path.join("credentials"),
        }
    }

    /// Load the credentials file, bootstrapping it first if missing.
    pub fn load(&self) -> Result<Credentials, VueError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(_) => {
                debug!("no credentials file; bootstrapping a fresh device record");
                self.reset()
            }
        }
    }

    /// Overwrite the file with a fresh bootstrap record and return it.
    pub fn reset(&self) -> Result<Credentials, VueError> {
        let credentials = Credentials::bootstrap();
        self.write(&credentials)?;
        Ok(credentials)
    }

    /// Merge `update` over the stored record and write it back.
    pub fn save(&self, update: CredentialUpdate) -> Result<Credentials, VueError> {
        let stored = self.load()?;
        let merged = Credentials {
            device_id: update.device_id.unwrap_or(stored.device_id),
            code: update.code.or(stored.code),
            expiry_date: update.expiry_date.unwrap_or(stored.expiry_date),
            profile_data: update.profile_data.or(stored.profile_data),
        };
        self.write(&merged)?;
        Ok(merged)
    }

    fn write(&self, credentials: &Credentials) -> Result<(), VueError> {
        let text = serde_json::to_string(credentials)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn bootstrap_record_is_expired_with_valid_uuid() {
        let (_dir, store) = store();
        store.reset().unwrap();
        let credentials = store.load().unwrap();

        assert!(Uuid::parse_str(&credentials.device_id).is_ok());
        assert_eq!(credentials.code, None);
        assert_eq!(credentials.profile_data, None);
        assert!(!credentials.is_valid_at(Utc::now()));
    }

    #[test]
    fn load_bootstraps_missing_file() {
        let (_dir, store) = store();
        let credentials = store.load().unwrap();
        assert!(Uuid::parse_str(&credentials.device_id).is_ok());
        // Second load reads the same record back, not a new one
        assert_eq!(store.load().unwrap(), credentials);
    }

    #[test]
    fn save_merges_single_field_updates() {
        let (_dir, store) = store();
        let original = store.load().unwrap();

        store
            .save(CredentialUpdate {
                code: Some("grant-code".to_string()),
                ..Default::default()
            })
            .unwrap();
        let after_code = store.load().unwrap();
        assert_eq!(after_code.device_id, original.device_id);
        assert_eq!(after_code.code.as_deref(), Some("grant-code"));
        assert_eq!(after_code.expiry_date, original.expiry_date);
        assert_eq!(after_code.profile_data, None);

        store
            .save(CredentialUpdate {
                expiry_date: Some("2030-01-01T00:00:00Z".to_string()),
                ..Default::default()
            })
            .unwrap();
        let after_expiry = store.load().unwrap();
        assert_eq!(after_expiry.code.as_deref(), Some("grant-code"));
        assert_eq!(after_expiry.expiry_date, "2030-01-01T00:00:00Z");

        store
            .save(CredentialUpdate {
                profile_data: Some(json!({"profile_data": {"favorites": []}})),
                ..Default::default()
            })
            .unwrap();
        let after_profile = store.load().unwrap();
        assert_eq!(after_profile.code.as_deref(), Some("grant-code"));
        assert_eq!(after_profile.expiry_date, "2030-01-01T00:00:00Z");
        assert!(after_profile.profile_data.is_some());
        assert_eq!(after_profile.device_id, original.device_id);
    }

    #[test]
    fn empty_update_changes_nothing() {
        let (_dir, store) = store();
        let original = store.load().unwrap();
        store.save(CredentialUpdate::default()).unwrap();
        assert_eq!(store.load().unwrap(), original);
    }

    #[test]
    fn validity_compares_against_now() {
        let future = Utc::now() + Duration::hours(1);
        let past = Utc::now() - Duration::hours(1);
        let mut credentials = Credentials::bootstrap();

        credentials.expiry_date = future.to_rfc3339();
        assert!(credentials.is_valid_at(Utc::now()));

        credentials.expiry_date = past.to_rfc3339();
        assert!(!credentials.is_valid_at(Utc::now()));

        credentials.expiry_date = "garbage".to_string();
        assert!(!credentials.is_valid_at(Utc::now()));
    }

    #[test]
    fn offsetless_timestamps_parse_as_utc() {
        let parsed = parse_iso8601("2026-03-01T12:30:45.123456").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T12:30:45.123456+00:00");
        assert!(parse_iso8601("2026-03-01T12:30:45Z").is_some());
    }
}
