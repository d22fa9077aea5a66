//! Steam Big Picture plugin for Stream Deck
//!
//! Toggles Steam between off, running and Big Picture mode from a Stream
//! Deck button, with a configurable long-press action, and keeps every
//! button's displayed state in sync with Steam.

pub mod config;
pub mod drivers;
pub mod error;
pub mod launch;
pub mod paths;
pub mod plugin;
pub mod protocol;
pub mod state;
pub mod sync;
pub mod transport;

pub use error::{PluginError, Result};
pub use state::ApplicationState;
