//! Stream client errors.

use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors returned by the stream client.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The websocket failed.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// A frame could not be decoded.
    #[error("Malformed frame: {0}")]
    Codec(String),

    /// An event payload is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server did not complete the socket.io handshake.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The operation needs an open connection.
    #[error("Not connected to the stream server")]
    NotConnected,

    /// Reconnecting failed too many times.
    #[error("Gave up reconnecting after {0} attempts")]
    ReconnectExhausted(u32),

    /// `start_stream` was called without a stream type.
    #[error("You need to set a stream type")]
    MissingStreamType,

    /// Stream parameters are not a JSON object.
    #[error("Stream parameters must be an object, got {0}")]
    InvalidParameters(Value),

    /// The configured server URL cannot be used for a websocket.
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),

    /// A configured header is not a valid HTTP header.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl From<tungstenite::Error> for StreamError {
    fn from(error: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(error))
    }
}
