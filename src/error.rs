//! Error types for the plugin library

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Malformed protocol message: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to push to context {context}: {reason}")]
    Push { context: String, reason: String },

    #[error("Plugin actor is no longer running")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, PluginError>;
