//! Short/long press classification
//!
//! Each context is either idle or has exactly one [`PendingPress`]. A key-down
//! starts a long-press timer; whichever of "timer elapsed" or "key-up" the
//! actor processes first consumes the pending record and decides the press.
//! The loser finds nothing to consume and does nothing, so every press
//! resolves exactly once.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::commands::PluginCommand;
use crate::protocol::ContextSettings;

/// Outcome of a completed press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    Short,
    Long,
}

/// Posted to the actor when a long-press timer runs out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongPressElapsed {
    pub context: String,
    /// Identifies the key-down that armed the timer
    pub press_id: u64,
}

/// A key that is currently held down
#[derive(Debug)]
struct PendingPress {
    press_id: u64,
    started_at: Instant,
    /// Settings carried by the key-down event
    settings: ContextSettings,
    timer: JoinHandle<()>,
}

/// Per-context press state machine
///
/// Timers are tokio tasks that post [`PluginCommand::LongPressElapsed`] back
/// to the actor. Cancelling a press aborts its timer.
pub struct PressClassifier {
    pending: HashMap<String, PendingPress>,
    next_press_id: u64,
    threshold: Duration,
    timer_tx: mpsc::UnboundedSender<PluginCommand>,
}

impl PressClassifier {
    pub fn new(threshold: Duration, timer_tx: mpsc::UnboundedSender<PluginCommand>) -> Self {
        Self {
            pending: HashMap::new(),
            next_press_id: 0,
            threshold,
            timer_tx,
        }
    }

    /// Record a key-down and arm the long-press timer
    ///
    /// A key-down while a press is already pending is a protocol anomaly: the
    /// earlier press is cancelled without resolving and a fresh one starts.
    pub fn key_down(&mut self, context: &str, settings: ContextSettings) {
        if let Some(stale) = self.pending.remove(context) {
            stale.timer.abort();
            warn!(
                context,
                press_id = stale.press_id,
                held_ms = stale.started_at.elapsed().as_millis() as u64,
                "keyDown while a press is pending, restarting press"
            );
        }

        let press_id = self.next_press_id;
        self.next_press_id += 1;

        let tx = self.timer_tx.clone();
        let threshold = self.threshold;
        let elapsed = LongPressElapsed {
            context: context.to_string(),
            press_id,
        };
        let timer = tokio::spawn(async move {
            tokio::time::sleep(threshold).await;
            let _ = tx.send(PluginCommand::LongPressElapsed(elapsed));
        });

        trace!(context, press_id, "Press started");
        self.pending.insert(
            context.to_string(),
            PendingPress {
                press_id,
                started_at: Instant::now(),
                settings,
                timer,
            },
        );
    }

    /// Resolve a key-up
    ///
    /// Returns `None` when nothing is pending (the long press already fired,
    /// or the key-up is stray). A press that reached the threshold but whose
    /// timer message has not been processed yet resolves as long here.
    pub fn key_up(&mut self, context: &str) -> Option<Press> {
        let Some(pending) = self.pending.remove(context) else {
            debug!(context, "keyUp with no pending press");
            return None;
        };
        pending.timer.abort();

        let held = pending.started_at.elapsed();
        debug!(context, held_ms = held.as_millis() as u64, "Press duration");

        if held < self.threshold {
            Some(Press::Short)
        } else {
            Some(Press::Long)
        }
    }

    /// Resolve a fired timer
    ///
    /// Returns the key-down's settings when the timer still owned the pending
    /// press, i.e. the long press should fire. Timers from cancelled or
    /// replaced presses are ignored.
    pub fn long_press_elapsed(&mut self, elapsed: &LongPressElapsed) -> Option<ContextSettings> {
        match self.pending.get(&elapsed.context) {
            Some(pending) if pending.press_id == elapsed.press_id => {
                let pending = self.pending.remove(&elapsed.context)?;
                debug!(context = %elapsed.context, "Long press threshold reached");
                Some(pending.settings)
            }
            _ => {
                trace!(
                    context = %elapsed.context,
                    press_id = elapsed.press_id,
                    "Ignoring stale long-press timer"
                );
                None
            }
        }
    }

    /// Drop a context's pending press without resolving it
    pub fn cancel(&mut self, context: &str) -> bool {
        match self.pending.remove(context) {
            Some(pending) => {
                pending.timer.abort();
                debug!(context, "Pending press cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending press
    pub fn clear(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.timer.abort();
        }
    }

    pub fn is_pending(&self, context: &str) -> bool {
        self.pending.contains_key(context)
    }

    /// Contexts with a key currently held, sorted
    pub fn pending_contexts(&self) -> Vec<String> {
        let mut contexts: Vec<String> = self.pending.keys().cloned().collect();
        contexts.sort();
        contexts
    }
}

impl Drop for PressClassifier {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::LONG_PRESS_THRESHOLD;
    use tokio::time::{advance, sleep};

    fn classifier() -> (PressClassifier, mpsc::UnboundedReceiver<PluginCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PressClassifier::new(LONG_PRESS_THRESHOLD, tx), rx)
    }

    fn next_elapsed(rx: &mut mpsc::UnboundedReceiver<PluginCommand>) -> Option<LongPressElapsed> {
        match rx.try_recv() {
            Ok(PluginCommand::LongPressElapsed(elapsed)) => Some(elapsed),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_release_is_short() {
        let (mut classifier, mut rx) = classifier();

        classifier.key_down("a", ContextSettings::default());
        advance(Duration::from_millis(300)).await;
        assert_eq!(classifier.key_up("a"), Some(Press::Short));
        assert!(!classifier.is_pending("a"));

        // Timer was aborted: nothing arrives even well past the threshold
        sleep(Duration::from_secs(5)).await;
        assert!(next_elapsed(&mut rx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_at_threshold() {
        let (mut classifier, mut rx) = classifier();

        classifier.key_down("b", ContextSettings::default());
        sleep(Duration::from_millis(1999)).await;
        assert!(next_elapsed(&mut rx).is_none());

        sleep(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        let elapsed = next_elapsed(&mut rx).expect("timer should have fired");
        assert_eq!(elapsed.context, "b");
        assert!(classifier.long_press_elapsed(&elapsed).is_some());

        // Key-up after the long press is a no-op
        assert_eq!(classifier.key_up("b"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_carries_key_down_settings() {
        let (mut classifier, mut rx) = classifier();
        let settings = ContextSettings {
            always_enter_presentation_on_launch: true,
            long_press_action: crate::protocol::LongPressAction::Terminate,
            ..Default::default()
        };

        classifier.key_down("f", settings.clone());
        sleep(LONG_PRESS_THRESHOLD + Duration::from_millis(1)).await;
        let elapsed = next_elapsed(&mut rx).expect("timer should have fired");

        assert_eq!(classifier.long_press_elapsed(&elapsed), Some(settings));
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_up_racing_queued_timer_resolves_once() {
        let (mut classifier, mut rx) = classifier();

        classifier.key_down("c", ContextSettings::default());
        sleep(Duration::from_millis(2100)).await;
        let elapsed = next_elapsed(&mut rx).expect("timer message queued");

        // Key-up processed before the queued timer message
        assert_eq!(classifier.key_up("c"), Some(Press::Long));
        assert!(classifier.long_press_elapsed(&elapsed).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_key_down_replaces_pending_press() {
        let (mut classifier, mut rx) = classifier();

        classifier.key_down("d", ContextSettings::default());
        sleep(Duration::from_millis(1500)).await;
        classifier.key_down("d", ContextSettings::default());
        assert_eq!(classifier.pending_contexts(), vec!["d".to_string()]);

        // The first timer was aborted; only the second one fires, 2000ms after the re-press
        sleep(Duration::from_millis(1000)).await;
        assert!(next_elapsed(&mut rx).is_none());

        sleep(Duration::from_millis(1000)).await;
        tokio::task::yield_now().await;
        let elapsed = next_elapsed(&mut rx).expect("second timer fires");
        assert!(classifier.long_press_elapsed(&elapsed).is_some());
        assert!(next_elapsed(&mut rx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_timer() {
        let (mut classifier, mut rx) = classifier();

        classifier.key_down("e", ContextSettings::default());
        assert!(classifier.cancel("e"));
        assert!(!classifier.cancel("e"));

        sleep(Duration::from_secs(3)).await;
        assert!(next_elapsed(&mut rx).is_none());
        assert_eq!(classifier.key_up("e"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contexts_are_independent() {
        let (mut classifier, _rx) = classifier();

        classifier.key_down("x", ContextSettings::default());
        advance(Duration::from_millis(1000)).await;
        classifier.key_down("y", ContextSettings::default());
        advance(Duration::from_millis(500)).await;

        assert_eq!(classifier.key_up("y"), Some(Press::Short));
        assert!(classifier.is_pending("x"));
        classifier.clear();
        assert!(classifier.pending_contexts().is_empty());
    }
}
