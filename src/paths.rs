//! Plugin path management
//!
//! Stream Deck unpacks each plugin into its own folder
//! (`%APPDATA%\Elgato\StreamDeck\Plugins\<id>.sdPlugin`) and starts the
//! executable from there. The log file and the optional config live next to
//! the executable.
//!
//! Note: This is resolved before logging is initialized.

use std::path::{Path, PathBuf};

/// Log file name inside the plugin directory
pub const LOG_FILE_NAME: &str = "plugin.log";

/// Optional config file name inside the plugin directory
pub const CONFIG_FILE_NAME: &str = "plugin.yaml";

/// Plugin paths for config and logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    /// Directory containing the plugin executable
    pub dir: PathBuf,
    pub log_file: PathBuf,
    pub config: PathBuf,
}

impl PluginPaths {
    /// Resolve paths relative to the running executable
    ///
    /// Falls back to the current directory if the executable path is
    /// unavailable.
    pub fn detect() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(dir)
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            log_file: dir.join(LOG_FILE_NAME),
            config: dir.join(CONFIG_FILE_NAME),
            dir,
        }
    }
}
