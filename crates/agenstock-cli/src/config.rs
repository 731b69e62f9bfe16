//! CLI credential storage.
//!
//! Persists the logged-in user, access token and an optional server URL to
//! `~/.agenstock/config.json`. Client behavior settings live in the layered
//! [`agenstock_core::Config`] instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Server URL used at login time (e.g., "<https://agenstock.example.com>").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Authentication credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

/// Stored authentication credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub access_token: String,
}

impl CliConfig {
    /// Path to the state directory: `~/.agenstock/`.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".agenstock"))
    }

    /// Path to the config file: `~/.agenstock/config.json`.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.json"))
    }

    /// Load config from disk. Returns default if file doesn't exist or is invalid.
    pub fn load() -> Self {
        Self::config_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let path =
            Self::config_path().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Clear stored auth credentials.
    pub fn clear_auth(&mut self) {
        self.auth = None;
    }

    pub fn access_token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.access_token.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn alice() -> AuthConfig {
        AuthConfig {
            username: "alice".into(),
            access_token: "at".into(),
        }
    }

    #[test]
    fn default_config_has_no_credentials() {
        let cfg = CliConfig::default();
        assert!(cfg.auth.is_none());
        assert!(cfg.base_url.is_none());
        assert!(cfg.access_token().is_none());
    }

    #[test]
    fn config_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = CliConfig {
            base_url: Some("https://agenstock.test".into()),
            auth: Some(alice()),
        };
        cfg.save_to(&path).unwrap();
        let loaded = CliConfig::load_from(&path);
        assert_eq!(loaded.base_url.as_deref(), Some("https://agenstock.test"));
        assert_eq!(loaded.auth.unwrap().username, "alice");
    }

    #[test]
    fn clear_auth_removes_credentials() {
        let mut cfg = CliConfig {
            auth: Some(alice()),
            ..Default::default()
        };
        assert_eq!(cfg.access_token(), Some("at"));
        cfg.clear_auth();
        assert!(cfg.auth.is_none());
    }

    #[test]
    fn invalid_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CliConfig::load_from(&path).auth.is_none());
        assert!(CliConfig::load_from(&dir.path().join("missing.json")).auth.is_none());
    }

    #[test]
    fn none_fields_are_omitted() {
        let json = serde_json::to_string(&CliConfig::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn config_path_contains_agenstock() {
        if let Some(path) = CliConfig::config_path() {
            assert!(path.to_string_lossy().contains(".agenstock"));
            assert!(path.to_string_lossy().contains("config.json"));
        }
    }
}
