use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::processing::{Preset, ProcessingOptions};

fn default_loaded_name() -> String {
    "Loaded Project".to_string()
}

fn default_preset_name() -> String {
    Preset::Custom.name().to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdmSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

/// Saved project (`*.odm`): images, preset, options and server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_loaded_name")]
    pub name: String,

    /// Preset name as shown to the user
    #[serde(default = "default_preset_name")]
    pub preset: String,

    #[serde(default)]
    pub images: Vec<PathBuf>,

    #[serde(default)]
    pub options: ProcessingOptions,

    #[serde(default)]
    pub odm_settings: OdmSettings,
}

impl ProjectFile {
    pub fn new(name: Option<&str>, preset: Preset, images: Vec<PathBuf>, config: &AppConfig) -> Self {
        let mut options = ProcessingOptions::default();
        preset.apply(&mut options);

        Self {
            name: name.unwrap_or("Untitled Project").to_string(),
            preset: preset.name().to_string(),
            images,
            options,
            odm_settings: OdmSettings {
                base_url: config.base_url.clone(),
                token: config.token.clone(),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project {}", path.display()))?;
        let project: ProjectFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse project {}", path.display()))?;
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if self.images.is_empty() {
            bail!("No images to save. Add images first.");
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write project {}", path.display()))?;
        tracing::info!("Saved project '{}' to {}", self.name, path.display());
        Ok(())
    }

    /// Unrecognized preset names are treated as Custom
    pub fn preset(&self) -> Preset {
        match self.preset.parse() {
            Ok(preset) => preset,
            Err(e) => {
                tracing::warn!("{}; using stored options", e);
                Preset::Custom
            }
        }
    }

    /// Options to process with: the preset table for a named preset,
    /// the stored options for Custom
    pub fn effective_options(&self) -> ProcessingOptions {
        let mut options = self.options.clone();
        self.preset().apply(&mut options);
        options
    }

    pub fn missing_images(&self) -> Vec<&Path> {
        self.images
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| !p.exists())
            .collect()
    }

    /// Adopt the saved server settings, if any
    pub fn apply_settings(&self, config: &mut AppConfig) -> Result<bool> {
        if self.odm_settings.base_url.trim().is_empty() {
            return Ok(false);
        }
        config.set_credentials(&self.odm_settings.base_url, &self.odm_settings.token)?;
        Ok(true)
    }
}
