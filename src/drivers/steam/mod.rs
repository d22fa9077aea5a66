//! Steam driver for Windows
//!
//! Provides integration with the Steam desktop client for:
//! - Process and Big Picture window detection
//! - Launching (normal or straight into Big Picture)
//! - Entering/leaving Big Picture through `steam://` URIs
//! - Closing the main window to the tray and shutting Steam down

// Module declarations
mod driver;
mod shell;
#[cfg(windows)]
mod window;

// Re-export main types
pub use driver::SteamDriver;
