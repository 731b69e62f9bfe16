//! Configuration resolution for `AgenStock`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/agenstock/settings.json)
//! 3. Project config (.agenstock/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete `AgenStock` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

/// Chat client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the `AgenStock` HTTP API.
    pub base_url: String,
    /// Title given to newly created chat sessions.
    pub session_title: String,
    /// WebSocket handshake timeout (seconds).
    pub connect_timeout_secs: u64,
    /// How long headless mode waits for the next frame of a pending reply.
    pub response_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            session_title: "New Chat".to_string(),
            connect_timeout_secs: 10,
            response_timeout_secs: 120,
        }
    }
}

impl ClientConfig {
    /// WebSocket base derived from `base_url` (`http` -> `ws`, `https` -> `wss`).
    pub fn ws_base_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }

    /// Chat WebSocket endpoint for `user_id`.
    pub fn chat_ws_url(&self, user_id: &str) -> String {
        format!("{}/api/chat/ws/{user_id}", self.ws_base_url())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Default `RUST_LOG` filter for the configured level.
    pub fn default_filter(&self) -> String {
        format!("agenstock_cli={lvl},agenstock_core={lvl}", lvl = self.level)
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".agenstock").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".agenstock").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/agenstock/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("agenstock").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    base.client = overlay.client;
    base.logging = overlay.logging;
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("AGENSTOCK_BASE_URL") {
        config.client.base_url = val;
    }
    if let Some(val) = var("AGENSTOCK_SESSION_TITLE") {
        config.client.session_title = val;
    }
    if let Some(val) = var("AGENSTOCK_RESPONSE_TIMEOUT_SECS") {
        if let Ok(n) = val.parse() {
            config.client.response_timeout_secs = n;
        }
    }
    if let Some(val) = var("AGENSTOCK_LOG_LEVEL") {
        config.logging.level = val;
    }
}
