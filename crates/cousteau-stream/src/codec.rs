//! Engine.IO v4 / socket.io v5 text framing, default namespace only.
//!
//! Every websocket text frame is one Engine.IO packet: a single digit type
//! followed by its data. Engine.IO `4` (message) frames carry a socket.io
//! packet, again a single digit type followed by its data.

use serde_json::Value;

use crate::StreamError;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO open, with the session parameters sent by the server.
    Open(Value),
    /// Engine.IO close.
    Close,
    /// Engine.IO ping.
    Ping,
    /// Engine.IO pong.
    Pong,
    /// Engine.IO noop.
    Noop,
    /// Socket.IO namespace connect; the server's ack carries the session id.
    Connect(Option<Value>),
    /// Socket.IO namespace disconnect.
    Disconnect,
    /// Socket.IO event.
    Event {
        /// Event name.
        name: String,
        /// First event argument, `null` if there is none.
        data: Value,
    },
    /// Socket.IO connect refusal.
    ConnectError(Value),
}

impl Packet {
    /// Creates an event packet.
    #[must_use]
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self::Event {
            name: name.into(),
            data,
        }
    }

    /// Encodes the packet as a websocket text frame.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(data) => format!("0{data}"),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Noop => "6".to_string(),
            Self::Connect(None) => "40".to_string(),
            Self::Connect(Some(data)) => format!("40{data}"),
            Self::Disconnect => "41".to_string(),
            Self::Event { name, data } => {
                format!("42{}", Value::Array(vec![Value::String(name.clone()), data.clone()]))
            }
            Self::ConnectError(data) => format!("44{data}"),
        }
    }

    /// Decodes a websocket text frame.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Codec`] for unknown packet types or events on
    /// another namespace, and [`StreamError::Json`] for invalid payloads.
    pub fn decode(frame: &str) -> Result<Self, StreamError> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| StreamError::Codec("empty frame".to_string()))?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => decode_message(rest),
            '6' => Ok(Self::Noop),
            other => Err(StreamError::Codec(format!(
                "unsupported engine.io packet type <{other}>"
            ))),
        }
    }
}

fn decode_message(message: &str) -> Result<Packet, StreamError> {
    let mut chars = message.chars();
    let kind = chars
        .next()
        .ok_or_else(|| StreamError::Codec("empty socket.io packet".to_string()))?;
    let rest = chars.as_str();
    if rest.starts_with('/') {
        return Err(StreamError::Codec(format!(
            "packet for another namespace: {message}"
        )));
    }

    match kind {
        '0' if rest.is_empty() => Ok(Packet::Connect(None)),
        '0' => Ok(Packet::Connect(Some(serde_json::from_str(rest)?))),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(rest),
        '4' => Ok(Packet::ConnectError(
            serde_json::from_str(rest).unwrap_or_else(|_| Value::String(rest.to_string())),
        )),
        other => Err(StreamError::Codec(format!(
            "unsupported socket.io packet type <{other}>"
        ))),
    }
}

fn decode_event(data: &str) -> Result<Packet, StreamError> {
    // Events sent with an ack carry its id before the payload.
    let payload = data.trim_start_matches(|c: char| c.is_ascii_digit());
    let Value::Array(args) = serde_json::from_str(payload)? else {
        return Err(StreamError::Codec(format!("event is not an array: {payload}")));
    };
    let mut args = args.into_iter();
    let Some(Value::String(name)) = args.next() else {
        return Err(StreamError::Codec(format!("event without a name: {payload}")));
    };
    let data = args.next().unwrap_or(Value::Null);
    Ok(Packet::Event { name, data })
}
