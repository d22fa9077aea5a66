//! Application drivers (Steam, console simulation)
//!
//! A driver plays two roles: it answers "what state is Steam in?" through
//! [`StateProber`] and performs transitions through [`ActionDriver`]. Both
//! talk to the operating system and may take noticeable wall-clock time, so
//! they are only ever awaited from spawned tasks, never from the plugin actor.

use anyhow::Result;
use async_trait::async_trait;

use crate::state::ApplicationState;

/// Queries the current state of the target application
#[async_trait]
pub trait StateProber: Send + Sync {
    /// Determine the current application state
    ///
    /// Errors are reported to the caller; the failure policy lives in
    /// [`crate::sync::probe_or_off`].
    async fn probe(&self) -> Result<ApplicationState>;
}

/// Performs side-effecting transitions on the target application
///
/// Note: All methods take &self (not &mut self) to support Arc<dyn ActionDriver>.
/// Drivers should use interior mutability for mutable state.
#[async_trait]
pub trait ActionDriver: Send + Sync {
    /// Get the driver name (e.g., "steam", "console")
    fn name(&self) -> &str;

    /// Start the application, optionally straight into Big Picture mode
    async fn launch(&self, direct_to_presentation: bool) -> Result<()>;

    async fn enter_presentation_mode(&self) -> Result<()>;

    async fn exit_presentation_mode(&self) -> Result<()>;

    /// Close the main window so the application keeps running in the tray
    async fn minimize_to_tray(&self) -> Result<()>;

    /// Shut the application down
    async fn terminate(&self) -> Result<()>;
}

pub mod console;
pub mod steam;

pub use console::ConsoleDriver;
pub use steam::SteamDriver;
