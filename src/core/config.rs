//! Application configuration management

use std::path::PathBuf;

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// File name offered when saving to disk
pub const DEFAULT_DOWNLOAD_FILE_NAME: &str = "saved-vaadin-e-xell-file.xlsx";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web storage settings
    pub storage: StorageConfig,
    /// UI settings
    pub ui: UiConfig,
    /// File name suggested by "Save to disk"
    pub download_file_name: String,
}

/// Web storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding stored items (defaults to the platform data dir)
    pub storage_dir: Option<PathBuf>,
    /// Gzip level used by the storage codec, 0-9
    pub compression_level: u32,
}

/// UI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Theme (light/dark)
    pub theme: String,
    /// Rows shown in the sheet grid beyond the used range
    pub visible_rows: u32,
    /// Columns shown in the sheet grid beyond the used range
    pub visible_columns: u32,
    /// How long notifications stay on screen
    pub notification_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            ui: UiConfig::default(),
            download_file_name: DEFAULT_DOWNLOAD_FILE_NAME.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            compression_level: 6,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            visible_rows: 50,
            visible_columns: 12,
            notification_seconds: 4,
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "exell", "e-xell")
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Get the web storage directory
    pub fn storage_dir(&self) -> PathBuf {
        self.storage.storage_dir.clone().unwrap_or_else(|| {
            Self::project_dirs()
                .map(|dirs| dirs.data_dir().join("web-storage"))
                .unwrap_or_else(|| PathBuf::from("web-storage"))
        })
    }

    /// Whether the light theme is selected
    pub fn light_theme(&self) -> bool {
        self.ui.theme.eq_ignore_ascii_case("light")
    }
}
