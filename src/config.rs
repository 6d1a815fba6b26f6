//! Portal configuration
//!
//! Loaded from `~/.custodian/config.json`. Every field has a serde default so
//! a partial (or absent) file degrades to a working local-only portal instead
//! of failing startup.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PortalError;

/// Remote record-store endpoint. When absent, the portal runs local-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Base URL of the PostgREST-style record service.
    pub url: String,
    /// API key sent as both `apikey` and bearer token.
    pub api_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_remote_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    /// Base64-obfuscate backup payloads. Reversible encoding, not
    /// confidentiality.
    #[serde(default = "default_encode_payloads")]
    pub encode_payloads: bool,
    /// Days a completed backup is kept before the scheduler prunes it.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Minutes between automatic backups when the scheduler is running.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Sections included in automatic backups. Empty means all of them.
    #[serde(default)]
    pub data_types: Vec<crate::types::DataType>,
}

fn default_encode_payloads() -> bool {
    true
}

fn default_retention_days() -> u32 {
    30
}

fn default_interval_minutes() -> u64 {
    1440
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            encode_payloads: default_encode_payloads(),
            retention_days: default_retention_days(),
            interval_minutes: default_interval_minutes(),
            data_types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
    /// Entries kept in the persisted search history.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Entries kept in the recent-searches list.
    #[serde(default = "default_recent_cap")]
    pub recent_cap: usize,
}

fn default_search_limit() -> usize {
    50
}

fn default_history_cap() -> usize {
    100
}

fn default_recent_cap() -> usize {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            history_cap: default_history_cap(),
            recent_cap: default_recent_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalConfig {
    /// Override for the state directory. Defaults to `~/.custodian`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub backups: BackupConfig,
    #[serde(default)]
    pub search: SearchConfig,
    /// Activity-feed retention count.
    #[serde(default = "default_activity_cap")]
    pub activity_cap: usize,
    /// Webhook URL for the notification collaborator. Absent means
    /// notifications only go to the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_webhook: Option<String>,
}

fn default_activity_cap() -> usize {
    50
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            remote: None,
            backups: BackupConfig::default(),
            search: SearchConfig::default(),
            activity_cap: default_activity_cap(),
            notification_webhook: None,
        }
    }
}

impl PortalConfig {
    /// Resolve the state directory, creating it if needed.
    pub fn state_dir(&self) -> Result<PathBuf, PortalError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Sections to include in automatic backups.
    pub fn backup_data_types(&self) -> Vec<crate::types::DataType> {
        if self.backups.data_types.is_empty() {
            crate::types::DataType::ALL.to_vec()
        } else {
            self.backups.data_types.clone()
        }
    }
}

/// Canonical config file path: `~/.custodian/config.json`.
pub fn config_path() -> Result<PathBuf, PortalError> {
    Ok(default_state_dir()?.join("config.json"))
}

fn default_state_dir() -> Result<PathBuf, PortalError> {
    let home = dirs::home_dir()
        .ok_or_else(|| PortalError::Backend("Could not find home directory".to_string()))?;
    Ok(home.join(".custodian"))
}

/// Load configuration from `~/.custodian/config.json`.
///
/// A missing file yields the default (local-only) configuration; a present
/// but unreadable file is an error, not a silent fallback.
pub fn load_config() -> Result<PortalConfig, PortalError> {
    let path = config_path()?;
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(PortalConfig::default());
    }

    let content = fs::read_to_string(&path)?;
    let config: PortalConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Create or update config.json.
///
/// Clones the current config, applies the mutator, ensures the state
/// directory exists, and writes the result back.
pub fn update_config(
    current: &PortalConfig,
    mutator: impl FnOnce(&mut PortalConfig),
) -> Result<PortalConfig, PortalError> {
    let mut config = current.clone();
    mutator(&mut config);

    let path = config_path()?;
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(&config)?;
    fs::write(&path, content)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_yields_defaults() {
        let config: PortalConfig = serde_json::from_str("{}").expect("parse");
        assert!(config.remote.is_none());
        assert!(config.backups.encode_payloads);
        assert_eq!(config.backups.retention_days, 30);
        assert_eq!(config.search.history_cap, 100);
        assert_eq!(config.search.recent_cap, 10);
        assert_eq!(config.activity_cap, 50);
    }

    #[test]
    fn test_partial_remote_config() {
        let config: PortalConfig = serde_json::from_str(
            r#"{"remote":{"url":"https://records.example.org","apiKey":"k"}}"#,
        )
        .expect("parse");
        let remote = config.remote.expect("remote");
        assert_eq!(remote.timeout_secs, 10);
        assert_eq!(remote.url, "https://records.example.org");
    }

    #[test]
    fn test_backup_data_types_default_to_all() {
        let config = PortalConfig::default();
        assert_eq!(config.backup_data_types().len(), 6);
    }

    #[test]
    fn test_state_dir_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PortalConfig {
            data_dir: Some(dir.path().join("portal-state")),
            ..Default::default()
        };
        let resolved = config.state_dir().expect("state dir");
        assert!(resolved.exists());
        assert!(resolved.ends_with("portal-state"));
    }
}
