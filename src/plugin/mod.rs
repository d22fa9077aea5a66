//! Plugin core - press classification, context registry and the actor that owns them
//!
//! All mutable plugin state (live contexts, their settings, pending presses)
//! belongs to a single [`PluginActor`] task. Everything else talks to it
//! through a cloneable [`PluginHandle`]. OS work (probing Steam, running
//! actions) happens in spawned tasks so the actor never waits on it.

mod actor;
mod classifier;
mod commands;
mod handle;
mod handlers;
mod registry;

pub use actor::PluginActor;
pub use classifier::{LongPressElapsed, Press, PressClassifier};
pub use commands::{PluginCommand, PluginSnapshot};
pub use handle::PluginHandle;
pub use handlers::PressHandlers;
pub use registry::{BroadcastReport, ContextRegistry};

use std::time::Duration;

/// Holding a key at least this long is a long press
pub const LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(2000);

/// Delay between a short press's optimistic state push and the confirming re-sync
pub const RECONCILE_DELAY: Duration = Duration::from_millis(1500);

/// Delay before re-syncing after Steam was asked to shut down
pub const TERMINATE_RESYNC_DELAY: Duration = Duration::from_millis(500);
