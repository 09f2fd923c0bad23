//! Vendor configuration document and local client settings.
//!
//! The vendor publishes a JSON configuration keyed by app version; it is
//! cached at `<save_path>/configuration.json` and re-downloaded whenever
//! its version digits stop matching the client's declared app version.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::VueError;
use crate::session::{HttpSession, Method};

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    body: VendorConfig,
}

/// Endpoint URL templates from the vendor configuration document.
/// Unknown keys are ignored; the client only consumes these three plus the
/// version stamp.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    #[serde(rename = "epgContentBaseURL")]
    pub epg_content_base_url: String,
    #[serde(rename = "epgUserSessionBaseURL")]
    pub epg_user_session_base_url: String,
    /// URL template for the channel detail document
    pub channel: String,
    pub versioning: Versioning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Versioning {
    /// Sometimes "2.6.1", sometimes a bare number
    pub version: serde_json::Value,
}

impl VendorConfig {
    /// Load the cached configuration, re-downloading when missing, corrupt,
    /// or stamped with a different version than `app_version`.
    pub async fn load_or_fetch(
        session: &HttpSession,
        save_path: &Path,
        base_url: &str,
        app_version: &str,
    ) -> Result<Self, VueError> {
        let path = save_path.join("configuration.json");

        if let Ok(text) = fs::read_to_string(&path) {
            match serde_json::from_str::<ConfigDocument>(&text) {
                Ok(document) if document.body.version_matches(app_version) => {
                    return Ok(document.body);
                }
                Ok(_) => debug!("cached configuration version differs; re-downloading"),
                Err(err) => debug!(error = %err, "cached configuration is corrupt; re-downloading"),
            }
        }

        let text = Self::download(session, base_url).await?;
        fs::write(&path, &text)?;
        let document: ConfigDocument = serde_json::from_str(&text)?;
        Ok(document.body)
    }

    async fn download(session: &HttpSession, base_url: &str) -> Result<String, VueError> {
        let url = format!("{}configuration.json", base_url);
        let response = session.request(Method::Get, &url, None, None).await?;
        Ok(response.text().await?)
    }

    fn version_matches(&self, app_version: &str) -> bool {
        let stamped = version_digits(&value_to_string(&self.versioning.version), '.');
        let declared = version_digits(app_version, '_');
        match (stamped, declared) {
            (Some(stamped), Some(declared)) => stamped == declared,
            _ => false,
        }
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn version_digits(version: &str, separator: char) -> Option<u64> {
    version.replace(separator, "").parse().ok()
}

/// User preference for which manifest bitrate to play.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BitratePreference {
    #[default]
    Highest,
    Limit,
    Ask,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub enum TimeNotation {
    #[serde(rename = "12h")]
    H12,
    #[default]
    #[serde(rename = "24h")]
    H24,
}

/// Local client settings, stored as JSON in the platform config directory.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub preferred_bitrate: BitratePreference,
    #[serde(default = "default_max_bitrate")]
    pub max_bitrate_allowed: u32,
    #[serde(default)]
    pub time_notation: TimeNotation,
}

fn default_verify_ssl() -> bool {
    true
}

fn default_max_bitrate() -> u32 {
    u32::MAX
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            profile_name: String::new(),
            verify_ssl: default_verify_ssl(),
            preferred_bitrate: BitratePreference::default(),
            max_bitrate_allowed: default_max_bitrate(),
            time_notation: TimeNotation::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, VueError> {
        match Self::settings_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Settings::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, VueError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), VueError> {
        if let Some(path) = Self::settings_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), VueError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn settings_path() -> Option<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "psvue", "psvue-client")?;
        Some(proj_dirs.config_dir().join("settings.json"))
    }
}

/// Default per-profile data directory for cookies/credentials/configuration.
pub fn default_save_path() -> Option<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "psvue", "psvue-client")?;
    Some(proj_dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_version(version: serde_json::Value) -> VendorConfig {
        VendorConfig {
            epg_content_base_url: "https://epg.example.com/".to_string(),
            epg_user_session_base_url: "https://session.example.com/".to_string(),
            channel: "channel.json".to_string(),
            versioning: Versioning { version },
        }
    }

    #[test]
    fn dotted_version_matches_underscored_app_version() {
        assert!(config_with_version(json!("2.6.1")).version_matches("2_6_1"));
        assert!(!config_with_version(json!("2.6.0")).version_matches("2_6_1"));
    }

    #[test]
    fn numeric_version_stamp_still_compares() {
        assert!(config_with_version(json!(261)).version_matches("2_6_1"));
    }

    #[test]
    fn unparseable_version_never_matches() {
        assert!(!config_with_version(json!(null)).version_matches("2_6_1"));
    }

    #[test]
    fn settings_defaults_are_safe() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.verify_ssl);
        assert_eq!(settings.preferred_bitrate, BitratePreference::Highest);
        assert_eq!(settings.time_notation, TimeNotation::H24);
        assert_eq!(settings.max_bitrate_allowed, u32::MAX);
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            email: "user@example.com".to_string(),
            preferred_bitrate: BitratePreference::Limit,
            max_bitrate_allowed: 4000,
            time_notation: TimeNotation::H12,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.email, "user@example.com");
        assert_eq!(loaded.preferred_bitrate, BitratePreference::Limit);
        assert_eq!(loaded.max_bitrate_allowed, 4000);
        assert_eq!(loaded.time_notation, TimeNotation::H12);
    }
}
