//! SteamDriver core struct, probing and actions

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::shell;
use crate::config::SteamConfig;
use crate::drivers::{ActionDriver, StateProber};
use crate::state::ApplicationState;

/// Steam desktop client driver
pub struct SteamDriver {
    name: String,
    config: SteamConfig,
    /// Set while a minimize is in progress; concurrent requests are dropped
    closing: AtomicBool,
}

/// Clears the `closing` flag when a minimize attempt ends
struct ClosingGuard<'a>(&'a AtomicBool);

impl Drop for ClosingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SteamDriver {
    /// Create a new Steam driver
    pub fn new(config: SteamConfig) -> Self {
        Self {
            name: "steam".to_string(),
            config,
            closing: AtomicBool::new(false),
        }
    }

    /// Check if the Steam client process is running
    pub async fn is_running(&self) -> Result<bool> {
        let filter = format!("IMAGENAME eq {}", self.config.process_name);
        let stdout = shell::run("tasklist", &["/FI", &filter, "/NH"])
            .await
            .context("Failed to query process list")?;
        Ok(shell::tasklist_contains(&stdout, &self.config.process_name))
    }

    /// Check if a Big Picture window is open
    pub async fn is_big_picture(&self) -> Result<bool> {
        let script = format!(
            "(Get-Process -Name {} -ErrorAction SilentlyContinue | \
             Where-Object {{ $_.MainWindowTitle -match '{}' }} | \
             Select-Object -First 1) -ne $null",
            self.config.web_helper_process, self.config.big_picture_title
        );
        let output = shell::powershell(&script)
            .await
            .context("Failed to query Big Picture window")?;
        Ok(output.eq_ignore_ascii_case("true"))
    }

    /// Locate steam.exe: registry first, then the configured install paths
    pub async fn find_executable(&self) -> Option<PathBuf> {
        match shell::run(
            "reg",
            &[
                "query",
                &self.config.registry_key,
                "/v",
                &self.config.registry_value,
            ],
        )
        .await
        {
            Ok(stdout) => {
                if let Some(path) = shell::parse_reg_sz(&stdout, &self.config.registry_value) {
                    debug!("Found Steam in registry: {}", path.display());
                    return Some(path);
                }
            }
            Err(e) => debug!("Registry lookup failed: {:#}", e),
        }

        for candidate in &self.config.install_paths {
            let path = Path::new(candidate);
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                debug!("Found Steam at: {}", path.display());
                return Some(path.to_path_buf());
            }
        }

        warn!("Steam not found in registry or install paths");
        None
    }
}

#[async_trait]
impl StateProber for SteamDriver {
    async fn probe(&self) -> Result<ApplicationState> {
        if !self.is_running().await? {
            return Ok(ApplicationState::Off);
        }

        // A failed window query still means Steam is up
        let big_picture = match self.is_big_picture().await {
            Ok(flag) => flag,
            Err(e) => {
                debug!("Big Picture check failed, assuming desktop UI: {:#}", e);
                false
            }
        };

        Ok(if big_picture {
            ApplicationState::PresentationMode
        } else {
            ApplicationState::Running
        })
    }
}

#[async_trait]
impl ActionDriver for SteamDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn launch(&self, direct_to_presentation: bool) -> Result<()> {
        if direct_to_presentation {
            info!("🚀 Launching Steam directly into Big Picture mode");
            return shell::start(&self.config.open_big_picture_uri).await;
        }

        match self.find_executable().await {
            Some(exe) => {
                let exe = exe.to_string_lossy();
                shell::start(&exe).await?;
                info!("🚀 Steam launched from: {}", exe);
            }
            None => {
                info!("Trying {} as fallback", self.config.open_main_uri);
                shell::start(&self.config.open_main_uri).await?;
            }
        }
        Ok(())
    }

    async fn enter_presentation_mode(&self) -> Result<()> {
        info!("🖥️  Entering Big Picture mode");
        shell::start(&self.config.open_big_picture_uri).await
    }

    async fn exit_presentation_mode(&self) -> Result<()> {
        info!("🖥️  Exiting Big Picture mode");
        shell::start(&self.config.close_big_picture_uri).await
    }

    async fn minimize_to_tray(&self) -> Result<()> {
        if self.closing.swap(true, Ordering::AcqRel) {
            bail!("A minimize request is already in progress");
        }
        let _guard = ClosingGuard(&self.closing);

        #[cfg(windows)]
        let closed = super::window::close_window(&self.config.main_window_title);
        #[cfg(not(windows))]
        let closed: Result<()> = Err(anyhow::anyhow!(
            "Closing '{}' to the tray is only supported on Windows",
            self.config.main_window_title
        ));

        closed?;
        info!("Steam window closed to tray");
        Ok(())
    }

    async fn terminate(&self) -> Result<()> {
        match self.find_executable().await {
            Some(exe) => {
                shell::run(&exe.to_string_lossy(), &["-shutdown"]).await?;
                info!("🛑 Steam shutdown initiated gracefully");
            }
            None => {
                shell::run("taskkill", &["/IM", &self.config.process_name, "/F"]).await?;
                info!("🛑 Steam exited via taskkill (fallback)");
            }
        }
        Ok(())
    }
}
