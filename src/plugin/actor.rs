//! PluginActor - owns the context registry and the press classifier
//!
//! Commands are processed one at a time, so the registry and the pending
//! press map need no locking and a timer firing and a key-up can never both
//! resolve the same press.
//!
//! ```text
//!  transport ──Inbound──┐
//!  timers ──LongPress───┤
//!  sync loop ─Broadcast─┼──▶ command_rx ──▶ PluginActor ──spawn──▶ PressHandlers
//!  handlers ──SetState──┘                   │ registry
//!                                           │ classifier
//!                                           ▼
//!                                  Outbound (registered contexts only)
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::classifier::{Press, PressClassifier};
use super::commands::{PluginCommand, PluginSnapshot};
use super::handle::PluginHandle;
use super::handlers::PressHandlers;
use super::registry::ContextRegistry;
use super::LONG_PRESS_THRESHOLD;
use crate::drivers::{ActionDriver, StateProber};
use crate::protocol::{ContextSettings, InboundEvent, OutboundMessage};
use crate::state::ApplicationState;
use crate::sync::resync;
use crate::transport::Outbound;

/// Actor responsible for all per-context plugin state
pub struct PluginActor {
    registry: ContextRegistry,
    classifier: PressClassifier,
    handlers: PressHandlers,
    outbound: Arc<dyn Outbound>,
    prober: Arc<dyn StateProber>,
    plugin: PluginHandle,
    command_rx: mpsc::UnboundedReceiver<PluginCommand>,
}

impl PluginActor {
    /// Spawn a new PluginActor and return a handle for interacting with it
    pub fn spawn(
        prober: Arc<dyn StateProber>,
        driver: Arc<dyn ActionDriver>,
        outbound: Arc<dyn Outbound>,
    ) -> PluginHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let plugin = PluginHandle::new(cmd_tx.clone());

        let actor = PluginActor {
            registry: ContextRegistry::new(),
            classifier: PressClassifier::new(LONG_PRESS_THRESHOLD, cmd_tx),
            handlers: PressHandlers::new(Arc::clone(&prober), driver, plugin.clone()),
            outbound,
            prober,
            plugin: plugin.clone(),
            command_rx: cmd_rx,
        };

        tokio::spawn(actor.run());
        info!("PluginActor spawned");

        plugin
    }

    /// Main run loop for the actor
    async fn run(mut self) {
        debug!("PluginActor run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");

            match cmd {
                PluginCommand::Inbound(event) => self.handle_event(event),
                PluginCommand::LongPressElapsed(elapsed) => {
                    if let Some(settings) = self.classifier.long_press_elapsed(&elapsed) {
                        self.dispatch(Press::Long, &elapsed.context, settings);
                    }
                }
                PluginCommand::Broadcast(state) => {
                    let report = self.registry.broadcast_state(state, self.outbound.as_ref());
                    if report.failed > 0 {
                        warn!(%state, ?report, "Broadcast partially failed");
                    }
                }
                PluginCommand::SetState { context, state } => {
                    self.push_state(&context, state);
                }
                PluginCommand::Snapshot { response } => {
                    let _ = response.send(PluginSnapshot {
                        contexts: self.registry.entries(),
                        pending_presses: self.classifier.pending_contexts(),
                    });
                }
                PluginCommand::Shutdown => {
                    info!("PluginActor received shutdown command");
                    break;
                }
            }
        }

        self.classifier.clear();
        self.registry.clear();
        info!("PluginActor run loop terminated");
    }

    fn handle_event(&mut self, event: InboundEvent) {
        debug!(event = event.kind(), context = ?event.context(), "Received event");

        match event {
            InboundEvent::KeyDown { context, payload } => {
                self.registry
                    .update_settings(&context, payload.settings.clone());
                self.classifier.key_down(&context, payload.settings);
            }
            InboundEvent::KeyUp { context, payload } => {
                self.registry
                    .update_settings(&context, payload.settings.clone());
                if let Some(press) = self.classifier.key_up(&context) {
                    self.dispatch(press, &context, payload.settings);
                }
            }
            InboundEvent::ContextAppeared { context, payload } => {
                self.registry.register(&context, payload.settings);
                self.spawn_resync();
            }
            InboundEvent::ContextDisappeared { context } => {
                self.classifier.cancel(&context);
                self.registry.unregister(&context);
            }
            InboundEvent::SettingsChanged { context, payload } => {
                self.registry.update_settings(&context, payload.settings);
            }
            InboundEvent::PropertyInspectorAppeared { context } => {
                self.echo_settings(&context);
            }
            InboundEvent::PropertyInspectorDisappeared { context } => {
                debug!(context = %context, "Property inspector closed");
            }
            InboundEvent::SendToPlugin { context, payload } => {
                debug!(context = %context, %payload, "Message from property inspector");
            }
            InboundEvent::Unknown => {}
        }
    }

    /// Start the handler for a resolved press
    ///
    /// Registered contexts use their stored settings; otherwise the settings
    /// carried by the key event apply.
    fn dispatch(&self, press: Press, context: &str, event_settings: ContextSettings) {
        let settings = match self.registry.settings(context) {
            Some(settings) => settings.clone(),
            None => {
                debug!(context, ?press, "Press on unregistered context, using event settings");
                event_settings
            }
        };

        let handlers = self.handlers.clone();
        let context = context.to_string();
        match press {
            Press::Short => {
                tokio::spawn(async move { handlers.short_press(context, settings).await });
            }
            Press::Long => {
                tokio::spawn(async move { handlers.long_press(context, settings).await });
            }
        }
    }

    /// Show `state` on a single context, if it is still registered
    fn push_state(&self, context: &str, state: ApplicationState) {
        if !self.registry.contains(context) {
            debug!(context, %state, "Context not registered, dropping state");
            return;
        }

        if let Err(e) = self.outbound.push(OutboundMessage::set_state(context, state)) {
            warn!(context, %state, "Failed to push state: {}", e);
        }
    }

    /// Send a context's stored settings (or `{}`) to its property inspector
    fn echo_settings(&self, context: &str) {
        let message = match self.registry.settings(context) {
            Some(settings) => OutboundMessage::settings_to_inspector(context, settings),
            None => Ok(OutboundMessage::SendToPropertyInspector {
                context: context.to_string(),
                payload: Value::Object(Map::new()),
            }),
        };

        match message.and_then(|message| self.outbound.push(message)) {
            Ok(()) => debug!(context, "Sent settings to property inspector"),
            Err(e) => warn!(context, "Failed to send settings to property inspector: {}", e),
        }
    }

    /// Probe in the background and broadcast the result
    fn spawn_resync(&self) {
        let prober = Arc::clone(&self.prober);
        let plugin = self.plugin.clone();
        tokio::spawn(async move { resync(prober.as_ref(), &plugin).await });
    }
}
