use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_preset() -> String {
    "Default".to_string()
}

/// Process-wide settings shared by the CLI and the TUI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// NodeODM server address
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Access token, sent as `?token=` when non-empty
    #[serde(default)]
    pub token: String,

    /// Desktop notification when a watched task finishes
    #[serde(default)]
    pub notifications: bool,

    /// Preset selected when the TUI starts
    #[serde(default = "default_preset")]
    pub default_preset: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            notifications: false,
            default_preset: default_preset(),
        }
    }
}

/// Trim the URL and prepend `http://` when no scheme is given
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("odm-frontend");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace the server credentials and persist them
    pub fn set_credentials(&mut self, base_url: &str, token: &str) -> Result<()> {
        self.base_url = normalize_url(base_url);
        self.token = token.trim().to_string();
        self.save()
    }
}
