//! Configuration management for the Steam Big Picture plugin
//!
//! Button behaviour is configured per context through the property inspector
//! (see [`crate::protocol::ContextSettings`]). This file only describes how to
//! find and drive Steam. It is optional: a missing `plugin.yaml` yields the
//! defaults below, which match a stock Steam install on Windows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::PluginError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PluginConfig {
    #[serde(default)]
    pub steam: SteamConfig,
}

/// How to detect, launch and control Steam
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SteamConfig {
    /// Image name looked up with `tasklist`
    #[serde(default = "default_process_name")]
    pub process_name: String,
    /// Process owning the Big Picture window
    #[serde(default = "default_web_helper")]
    pub web_helper_process: String,
    /// Regex matched against the web helper's main window title
    #[serde(default = "default_big_picture_title")]
    pub big_picture_title: String,
    /// Title of the desktop client window closed by "minimize to tray"
    #[serde(default = "default_main_window_title")]
    pub main_window_title: String,
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
    #[serde(default = "default_registry_value")]
    pub registry_value: String,
    /// Checked in order when the registry lookup fails
    #[serde(default = "default_install_paths")]
    pub install_paths: Vec<String>,
    #[serde(default = "default_open_main_uri")]
    pub open_main_uri: String,
    #[serde(default = "default_open_big_picture_uri")]
    pub open_big_picture_uri: String,
    #[serde(default = "default_close_big_picture_uri")]
    pub close_big_picture_uri: String,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            web_helper_process: default_web_helper(),
            big_picture_title: default_big_picture_title(),
            main_window_title: default_main_window_title(),
            registry_key: default_registry_key(),
            registry_value: default_registry_value(),
            install_paths: default_install_paths(),
            open_main_uri: default_open_main_uri(),
            open_big_picture_uri: default_open_big_picture_uri(),
            close_big_picture_uri: default_close_big_picture_uri(),
        }
    }
}

impl PluginConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PluginConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the config if present, falling back to defaults
    ///
    /// A broken file is logged and ignored so the button keeps working.
    pub async fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path).await {
            Ok(config) => config,
            Err(e) => {
                warn!("⚠️  Ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<(), PluginError> {
        let steam = &self.steam;

        if steam.process_name.trim().is_empty() {
            return Err(PluginError::Config("steam.process_name cannot be empty".into()));
        }
        if steam.web_helper_process.trim().is_empty() {
            return Err(PluginError::Config(
                "steam.web_helper_process cannot be empty".into(),
            ));
        }
        for (name, uri) in [
            ("open_main_uri", &steam.open_main_uri),
            ("open_big_picture_uri", &steam.open_big_picture_uri),
            ("close_big_picture_uri", &steam.close_big_picture_uri),
        ] {
            if !uri.starts_with("steam://") {
                return Err(PluginError::Config(format!(
                    "steam.{} must be a steam:// URI (got '{}')",
                    name, uri
                )));
            }
        }

        Ok(())
    }
}

fn default_process_name() -> String { "steam.exe".to_string() }
fn default_web_helper() -> String { "steamwebhelper".to_string() }
fn default_big_picture_title() -> String { "Steam Big Picture Mode".to_string() }
fn default_main_window_title() -> String { "Steam".to_string() }
fn default_registry_key() -> String { r"HKCU\Software\Valve\Steam".to_string() }
fn default_registry_value() -> String { "SteamExe".to_string() }
fn default_open_main_uri() -> String { "steam://open/main".to_string() }
fn default_open_big_picture_uri() -> String { "steam://open/bigpicture".to_string() }
fn default_close_big_picture_uri() -> String { "steam://close/bigpicture".to_string() }

fn default_install_paths() -> Vec<String> {
    vec![
        r"C:\Program Files (x86)\Steam\steam.exe".to_string(),
        r"C:\Program Files\Steam\steam.exe".to_string(),
        r"C:\Games\Steam\steam.exe".to_string(),
    ]
}
