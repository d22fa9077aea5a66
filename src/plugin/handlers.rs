//! Short and long press handlers
//!
//! These run in spawned tasks: they probe Steam, invoke the driver, ask the
//! actor to show an optimistic state on the pressed button and schedule a
//! confirming re-sync.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::handle::PluginHandle;
use super::{RECONCILE_DELAY, TERMINATE_RESYNC_DELAY};
use crate::drivers::{ActionDriver, StateProber};
use crate::protocol::{ContextSettings, LongPressAction};
use crate::state::ApplicationState;
use crate::sync::{probe_or_off, resync};

/// Everything a press handler needs, shared by all handler tasks
#[derive(Clone)]
pub struct PressHandlers {
    prober: Arc<dyn StateProber>,
    driver: Arc<dyn ActionDriver>,
    plugin: PluginHandle,
}

impl PressHandlers {
    pub fn new(
        prober: Arc<dyn StateProber>,
        driver: Arc<dyn ActionDriver>,
        plugin: PluginHandle,
    ) -> Self {
        Self {
            prober,
            driver,
            plugin,
        }
    }

    /// Advance Steam one step through off → running ⇄ Big Picture
    pub async fn short_press(&self, context: String, settings: ContextSettings) {
        let current = probe_or_off(self.prober.as_ref()).await;
        let direct = settings.always_enter_presentation_on_launch;
        let target = current.after_short_press(direct);

        info!(context = %context, from = %current, to = %target, "Short press");

        let result = match current {
            ApplicationState::Off => self.driver.launch(direct).await,
            ApplicationState::Running => self.driver.enter_presentation_mode().await,
            ApplicationState::PresentationMode => self.driver.exit_presentation_mode().await,
        };

        match result {
            Ok(()) => self.push_state(&context, target),
            Err(e) => warn!(
                context = %context,
                driver = self.driver.name(),
                from = %current,
                "Action failed, waiting for re-sync: {:#}",
                e
            ),
        }

        self.schedule_resync(RECONCILE_DELAY);
    }

    /// Run the context's configured long-press action
    pub async fn long_press(&self, context: String, settings: ContextSettings) {
        let action = settings.long_press_action;
        info!(context = %context, ?action, "Long press");

        match action {
            LongPressAction::None => {}
            LongPressAction::Minimize => {
                if let Err(e) = self.driver.minimize_to_tray().await {
                    warn!(context = %context, "Minimize to tray failed: {:#}", e);
                }
            }
            LongPressAction::Terminate => {
                let current = probe_or_off(self.prober.as_ref()).await;
                if current.is_off() {
                    debug!(context = %context, "Steam not running, nothing to terminate");
                    return;
                }

                match self.driver.terminate().await {
                    Ok(()) => self.push_state(&context, ApplicationState::Off),
                    Err(e) => warn!(context = %context, "Terminate failed: {:#}", e),
                }
                self.schedule_resync(TERMINATE_RESYNC_DELAY);
            }
        }
    }

    fn push_state(&self, context: &str, state: ApplicationState) {
        debug!(context, %state, "Optimistic state");
        self.plugin.set_state(context, state);
    }

    /// Probe again after `delay` and broadcast the result
    fn schedule_resync(&self, delay: Duration) {
        let prober = Arc::clone(&self.prober);
        let plugin = self.plugin.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            resync(prober.as_ref(), &plugin).await;
        });
    }
}
