//! Stream Deck WebSocket transport
//!
//! The Stream Deck application starts the plugin with a port and expects it
//! to connect to `ws://127.0.0.1:<port>`, register itself, and then exchange
//! JSON text frames. Outgoing messages are queued on an unbounded channel
//! and written by a dedicated task so the plugin actor never awaits the
//! socket.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::error::PluginError;
use crate::plugin::PluginHandle;
use crate::protocol::{InboundEvent, OutboundMessage, Registration};
use crate::sync::SyncLoop;

/// Sink for messages addressed to a single context
pub trait Outbound: Send + Sync {
    fn push(&self, message: OutboundMessage) -> Result<(), PluginError>;
}

/// [`Outbound`] backed by the socket writer's queue
#[derive(Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<String>,
}

/// Create the outbound queue; the receiver is handed to [`run_session`]
pub fn outbound_channel() -> (OutboundSender, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutboundSender { tx }, rx)
}

impl Outbound for OutboundSender {
    fn push(&self, message: OutboundMessage) -> Result<(), PluginError> {
        let json = message.to_json()?;
        trace!(context = message.context(), %json, "Queueing message");
        self.tx.send(json).map_err(|_| PluginError::Push {
            context: message.context().to_string(),
            reason: "connection closed".to_string(),
        })
    }
}

/// Open the WebSocket to the local Stream Deck application
pub async fn connect(port: u16) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let url = format!("ws://127.0.0.1:{}", port);
    info!("Connecting to Stream Deck on {}", url);

    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("Failed to connect to Stream Deck at {}", url))?;

    info!("✅ Connected to Stream Deck");
    Ok(ws)
}

/// Drive one connection until the socket closes
///
/// Registers the plugin, starts `sync`, forwards inbound events to the
/// plugin actor and writes queued outbound messages. When the socket
/// closes or fails, polling stops and the function returns.
pub async fn run_session<S>(
    ws: WebSocketStream<S>,
    registration: Registration,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    plugin: PluginHandle,
    mut sync: SyncLoop,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = ws.split();

    let registration_json =
        serde_json::to_string(&registration).context("Failed to encode registration")?;
    debug!(event = %registration.event, uuid = %registration.uuid, "Registering plugin");
    sink.send(Message::Text(registration_json))
        .await
        .context("Failed to send registration")?;

    sync.start();

    let writer = tokio::spawn(async move {
        while let Some(json) = outbound_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(json)).await {
                warn!("Failed to write to Stream Deck: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let outcome = read_events(&mut stream, &plugin).await;

    sync.stop();
    writer.abort();
    info!("Disconnected from Stream Deck");

    outcome
}

async fn read_events<St>(stream: &mut St, plugin: &PluginHandle) -> Result<()>
where
    St: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!("WebSocket error: {}", e);
                return Err(PluginError::from(e).into());
            }
        };

        match frame {
            Message::Text(text) => {
                let event = match InboundEvent::parse(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Ignoring malformed message: {} ({})", e, text);
                        continue;
                    }
                };
                if plugin.inbound(event).is_err() {
                    warn!("Plugin actor stopped, closing session");
                    return Ok(());
                }
            }
            Message::Close(frame) => {
                debug!(?frame, "Close frame received");
                return Ok(());
            }
            other => trace!(?other, "Ignoring non-text frame"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ConsoleDriver;
    use crate::plugin::PluginActor;
    use crate::state::ApplicationState;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    #[test]
    fn test_outbound_sender_reports_closed_queue() {
        let (sender, rx) = outbound_channel();
        sender
            .push(OutboundMessage::set_state("a", ApplicationState::Running))
            .unwrap();

        drop(rx);
        let err = sender
            .push(OutboundMessage::set_state("a", ApplicationState::Running))
            .unwrap_err();
        assert!(matches!(err, PluginError::Push { context, .. } if context == "a"));
    }

    async fn next_json<S>(ws: &mut WebSocketStream<S>) -> Value
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let frame = timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_session_registers_and_answers_will_appear() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let registration = next_json(&mut ws).await;
            assert_eq!(registration, json!({"event": "registerPlugin", "uuid": "plugin-uuid"}));

            let appear = json!({
                "event": "willAppear",
                "context": "ctx-1",
                "payload": {"settings": {"longPressAction": "close"}}
            });
            ws.send(Message::Text(appear.to_string())).await.unwrap();

            let set_state = next_json(&mut ws).await;
            ws.close(None).await.unwrap();
            set_state
        });

        let driver = Arc::new(ConsoleDriver::new("test", ApplicationState::PresentationMode));
        let (outbound, outbound_rx) = outbound_channel();
        let plugin = PluginActor::spawn(driver.clone(), driver.clone(), Arc::new(outbound));
        let sync = SyncLoop::new(driver, plugin.clone());

        let ws = connect(port).await.unwrap();
        let registration = Registration {
            event: "registerPlugin".to_string(),
            uuid: "plugin-uuid".to_string(),
        };
        timeout(
            Duration::from_secs(5),
            run_session(ws, registration, outbound_rx, plugin.clone(), sync),
        )
        .await
        .expect("session should end when the server closes")
        .unwrap();

        let set_state = server.await.unwrap();
        assert_eq!(
            set_state,
            json!({"event": "setState", "context": "ctx-1", "payload": {"state": 2}})
        );

        plugin.shutdown();
    }
}
