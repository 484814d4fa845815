// Grid engine settings
// Loaded from ~/.config/celltable/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors from reading or writing the settings file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    // History
    #[serde(rename = "history.limit")]
    pub history_limit: usize,

    // Rows
    #[serde(rename = "rows.idKey")]
    pub row_id_key: String,

    // Column widths
    #[serde(rename = "grid.defaultColumnWidth")]
    pub default_column_width: f32,

    #[serde(rename = "grid.collapsedGroupWidth")]
    pub collapsed_group_width: f32,

    #[serde(rename = "grid.minColumnWidth")]
    pub min_column_width: f32,

    #[serde(rename = "grid.maxAutoFitWidth")]
    pub max_auto_fit_width: f32,

    #[serde(rename = "grid.autoFitPadding")]
    pub auto_fit_padding: f32,

    // Editing
    #[serde(rename = "editor.readOnly")]
    pub read_only: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            history_limit: 50,
            row_id_key: "id".to_string(),
            default_column_width: 140.0,
            collapsed_group_width: 56.0,
            min_column_width: 60.0,
            max_auto_fit_width: 600.0,
            auto_fit_padding: 15.0,
            read_only: false,
        }
    }
}

impl GridSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("celltable");
        config_dir.join("settings.toml")
    }

    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Save settings to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
