//! Streaming client.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::codec::Packet;
use crate::dispatch::{Dispatcher, EVENT_SUBSCRIBE, EVENT_UNSUBSCRIBE, STREAM_TYPE_RESULT};
use crate::{StreamConfig, StreamError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the event loop does after handling a frame.
enum Flow {
    Continue,
    /// The transport went away; reconnect.
    Dropped,
    /// The server ended the session.
    Closed,
}

/// Progress restoring a dropped connection. It lives on the client so a
/// cancelled [`AtlasStream::timeout`] resumes it on the next call.
#[derive(Debug)]
struct Recovery {
    attempt: u32,
    retry_at: Instant,
    /// Next subscription to replay once the socket is open.
    replay_from: usize,
}

/// Client for the RIPE Atlas streaming service.
///
/// The client starts disconnected. [`connect`](Self::connect) opens the
/// socket; callbacks bound with [`bind_channel`](Self::bind_channel) run
/// while [`timeout`](Self::timeout) waits for events.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use cousteau_stream::{AtlasStream, STREAM_TYPE_RESULT};
/// use serde_json::json;
///
/// # async fn run() -> Result<(), cousteau_stream::StreamError> {
/// let mut stream = AtlasStream::new();
/// stream.connect().await?;
/// stream.bind_channel("atlas_result", |result| println!("{result}"));
/// stream.start_stream(STREAM_TYPE_RESULT, json!({"msm": 1001})).await?;
/// stream.timeout(Some(Duration::from_secs(5))).await?;
/// stream.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct AtlasStream {
    config: StreamConfig,
    socket: Option<Socket>,
    dispatcher: Dispatcher,
    recovery: Option<Recovery>,
}

impl AtlasStream {
    /// Creates a client for the public streaming server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client with the given configuration.
    #[must_use]
    pub fn with_config(config: StreamConfig) -> Self {
        Self {
            config,
            socket: None,
            dispatcher: Dispatcher::default(),
            recovery: None,
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Returns true while a socket is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Returns true while a dropped connection is being restored.
    ///
    /// The next call to [`timeout`](Self::timeout) carries on with it.
    #[must_use]
    pub const fn is_reconnecting(&self) -> bool {
        self.recovery.is_some()
    }

    /// Returns the subscriptions acknowledged by the server, in order.
    #[must_use]
    pub fn subscriptions(&self) -> &[Value] {
        self.dispatcher.subscriptions()
    }

    /// Opens the connection and completes the socket.io handshake.
    ///
    /// An open connection is closed first. Acknowledged subscriptions are
    /// sent again on the new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or refuses the session.
    pub async fn connect(&mut self) -> Result<(), StreamError> {
        if let Some(proxy) = self.config.proxy_url() {
            warn!(
                proxy = %proxy,
                "proxies do not work with the websocket transport, connecting directly"
            );
        }
        self.recovery = None;
        if let Some(socket) = self.socket.take() {
            debug!("closing the previous stream connection");
            if let Err(e) = close_socket(socket).await {
                warn!(error = %e, "closing the previous stream connection failed");
            }
        }
        self.socket = Some(self.open_socket().await?);
        debug!(url = %self.config.base_url, "connected to RIPE Atlas stream");
        for parameters in self.dispatcher.subscriptions().to_vec() {
            debug!(params = %parameters, "resubscribing");
            self.emit(EVENT_SUBSCRIBE, parameters).await?;
        }
        Ok(())
    }

    /// Closes the connection and removes every channel binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the close frames cannot be sent.
    pub async fn disconnect(&mut self) -> Result<(), StreamError> {
        self.dispatcher.clear();
        self.recovery = None;
        let Some(socket) = self.socket.take() else {
            return Ok(());
        };
        close_socket(socket).await?;
        debug!("disconnected from RIPE Atlas stream");
        Ok(())
    }

    /// Binds a callback to a channel, replacing any previous one.
    ///
    /// The deprecated names `result`, `probe` and `error` are mapped to their
    /// `atlas_` channels. Result events carrying a list call `callback` once
    /// per result.
    pub fn bind_channel<F>(&mut self, channel: &str, callback: F)
    where
        F: FnMut(Value) + Send + 'static,
    {
        self.dispatcher.bind(channel, Box::new(callback));
    }

    /// Subscribes to a stream.
    ///
    /// `parameters` must be a JSON object or `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are not an object or the request
    /// cannot be sent.
    pub async fn start_stream(
        &mut self,
        stream_type: &str,
        parameters: Value,
    ) -> Result<(), StreamError> {
        if stream_type.is_empty() {
            return Err(StreamError::MissingStreamType);
        }
        self.subscribe(stream_type, parameters).await
    }

    /// Sends a subscription request.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are not an object or the request
    /// cannot be sent.
    pub async fn subscribe(
        &mut self,
        stream_type: &str,
        parameters: Value,
    ) -> Result<(), StreamError> {
        let parameters = stream_parameters(stream_type, parameters)?;
        debug!(params = %parameters, "subscribing");
        self.emit(EVENT_SUBSCRIBE, parameters).await
    }

    /// Ends a previous subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are not an object or the request
    /// cannot be sent.
    pub async fn unsubscribe(
        &mut self,
        stream_type: &str,
        parameters: Value,
    ) -> Result<(), StreamError> {
        let parameters = stream_parameters(stream_type, parameters)?;
        debug!(params = %parameters, "unsubscribing");
        self.emit(EVENT_UNSUBSCRIBE, parameters).await
    }

    /// Processes events for `duration`, or until the server ends the session
    /// when `None`.
    ///
    /// A dropped connection is re-established and its subscriptions replayed.
    /// When `duration` runs out first, the next call picks the reconnect up
    /// where it stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not connected or reconnecting fails
    /// for good.
    pub async fn timeout(&mut self, duration: Option<Duration>) -> Result<(), StreamError> {
        match duration {
            None => self.run().await,
            Some(duration) => tokio::time::timeout(duration, self.run())
                .await
                .unwrap_or(Ok(())),
        }
    }

    async fn run(&mut self) -> Result<(), StreamError> {
        loop {
            self.recover().await?;
            let frame = match self.socket.as_mut() {
                Some(socket) => socket.next().await,
                None => return Err(StreamError::NotConnected),
            };
            let flow = match frame {
                Some(Ok(message)) => self.handle_message(message).await?,
                Some(Err(e)) => {
                    warn!(error = %e, "stream connection lost");
                    Flow::Dropped
                }
                None => Flow::Dropped,
            };
            match flow {
                Flow::Continue => {}
                Flow::Dropped => {
                    debug!("disconnected from RIPE Atlas stream");
                    self.schedule_reconnect(1);
                }
                Flow::Closed => {
                    self.socket = None;
                    debug!("stream server ended the session");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_message(&mut self, message: Message) -> Result<Flow, StreamError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(Flow::Dropped),
            _ => return Ok(Flow::Continue),
        };
        match Packet::decode(&text) {
            Ok(Packet::Ping) => self.send(&Packet::Pong).await?,
            Ok(Packet::Event { name, data }) => self.dispatcher.dispatch(&name, data),
            Ok(Packet::Close) => return Ok(Flow::Dropped),
            Ok(Packet::Disconnect) => return Ok(Flow::Closed),
            Ok(Packet::ConnectError(data)) => {
                return Err(StreamError::Handshake(data.to_string()));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, frame = %text, "ignoring undecodable frame"),
        }
        Ok(Flow::Continue)
    }

    /// Drops the socket and plans reconnect `attempt` after its backoff.
    fn schedule_reconnect(&mut self, attempt: u32) {
        self.socket = None;
        let delay = self.config.reconnect.delay(attempt);
        self.recovery = Some(Recovery {
            attempt,
            retry_at: Instant::now() + delay,
            replay_from: 0,
        });
    }

    /// Reconnects and replays the subscriptions after a dropped connection.
    ///
    /// Every await point leaves `self.recovery` consistent, so dropping this
    /// future part way loses no progress.
    async fn recover(&mut self) -> Result<(), StreamError> {
        while let Some(recovery) = &self.recovery {
            let (attempt, retry_at) = (recovery.attempt, recovery.retry_at);
            if self.socket.is_none() {
                if let Some(max_retries) = self.config.reconnect.max_retries
                    && attempt > max_retries
                {
                    self.recovery = None;
                    return Err(StreamError::ReconnectExhausted(max_retries));
                }

                warn!(attempt, "reconnecting to RIPE Atlas stream");
                tokio::time::sleep_until(retry_at).await;
                match self.open_socket().await {
                    Ok(socket) => self.socket = Some(socket),
                    Err(e) => {
                        warn!(attempt, error = %e, "reconnect failed");
                        self.schedule_reconnect(attempt + 1);
                        continue;
                    }
                }
            }
            match self.replay().await {
                Ok(()) => {
                    debug!(attempt, "reconnected to RIPE Atlas stream");
                    self.recovery = None;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "resubscribing failed");
                    self.schedule_reconnect(attempt + 1);
                }
            }
        }
        Ok(())
    }

    /// Sends the acknowledged subscriptions from the replay cursor on.
    async fn replay(&mut self) -> Result<(), StreamError> {
        loop {
            let Some(index) = self.recovery.as_ref().map(|r| r.replay_from) else {
                return Ok(());
            };
            let Some(parameters) = self.dispatcher.subscriptions().get(index).cloned() else {
                return Ok(());
            };
            debug!(params = %parameters, "resubscribing");
            self.emit(EVENT_SUBSCRIBE, parameters).await?;
            if let Some(recovery) = self.recovery.as_mut() {
                recovery.replay_from = index + 1;
            }
        }
    }

    async fn emit(&mut self, name: &str, data: Value) -> Result<(), StreamError> {
        self.send(&Packet::event(name, data)).await
    }

    async fn send(&mut self, packet: &Packet) -> Result<(), StreamError> {
        let socket = self.socket.as_mut().ok_or(StreamError::NotConnected)?;
        socket.send(Message::Text(packet.encode())).await?;
        Ok(())
    }

    async fn open_socket(&self) -> Result<Socket, StreamError> {
        let mut request = self.config.socket_url()?.into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.config.user_agent)
                .map_err(|e| StreamError::InvalidHeader(format!("User-Agent: {e}")))?,
        );
        for (name, value) in &self.config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| StreamError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| StreamError::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(header_name, header_value);
        }

        let (mut socket, _) = connect_async(request).await?;
        handshake(&mut socket).await?;
        Ok(socket)
    }
}

/// Leaves the namespace, then closes the websocket.
async fn close_socket(mut socket: Socket) -> Result<(), StreamError> {
    socket.send(Message::Text(Packet::Disconnect.encode())).await?;
    socket.close(None).await?;
    Ok(())
}

/// Waits for the Engine.IO open packet, then joins the default namespace.
async fn handshake(socket: &mut Socket) -> Result<(), StreamError> {
    match read_packet(socket).await? {
        Packet::Open(session) => debug!(session = %session, "engine.io session opened"),
        other => {
            return Err(StreamError::Handshake(format!(
                "expected open packet, got {other:?}"
            )));
        }
    }

    socket
        .send(Message::Text(Packet::Connect(None).encode()))
        .await?;
    loop {
        match read_packet(socket).await? {
            Packet::Connect(_) => return Ok(()),
            Packet::Ping => {
                socket.send(Message::Text(Packet::Pong.encode())).await?;
            }
            Packet::ConnectError(data) => return Err(StreamError::Handshake(data.to_string())),
            Packet::Noop | Packet::Pong => {}
            other => {
                return Err(StreamError::Handshake(format!(
                    "expected connect packet, got {other:?}"
                )));
            }
        }
    }
}

async fn read_packet(socket: &mut Socket) -> Result<Packet, StreamError> {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => return Packet::decode(&text),
            Some(Ok(Message::Close(_))) | None => {
                return Err(StreamError::Handshake(
                    "connection closed during handshake".to_string(),
                ));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Adds `stream_type` to the parameters; result streams are buffered unless
/// asked otherwise.
fn stream_parameters(stream_type: &str, parameters: Value) -> Result<Value, StreamError> {
    let mut parameters = match parameters {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => return Err(StreamError::InvalidParameters(other)),
    };
    parameters.insert("stream_type".into(), Value::String(stream_type.to_string()));
    if stream_type == STREAM_TYPE_RESULT && !parameters.contains_key("buffering") {
        parameters.insert("buffering".into(), Value::Bool(true));
    }
    Ok(Value::Object(parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReconnectConfig;
    use serde_json::json;

    #[test]
    fn test_result_stream_defaults_to_buffering() {
        assert_eq!(
            stream_parameters("result", json!({"msm": 1001})).unwrap(),
            json!({"msm": 1001, "stream_type": "result", "buffering": true})
        );
        assert_eq!(
            stream_parameters("result", json!({"buffering": false})).unwrap(),
            json!({"stream_type": "result", "buffering": false})
        );
    }

    #[test]
    fn test_other_streams_are_not_buffered() {
        assert_eq!(
            stream_parameters("probe", Value::Null).unwrap(),
            json!({"stream_type": "probe"})
        );
    }

    #[test]
    fn test_parameters_must_be_an_object() {
        assert!(matches!(
            stream_parameters("result", json!([1])),
            Err(StreamError::InvalidParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_start_stream_requires_type() {
        let mut stream = AtlasStream::new();
        assert!(matches!(
            stream.start_stream("", Value::Null).await,
            Err(StreamError::MissingStreamType)
        ));
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut stream = AtlasStream::new();
        assert!(!stream.is_connected());
        assert!(matches!(
            stream.subscribe("result", json!({"msm": 1})).await,
            Err(StreamError::NotConnected)
        ));
        assert!(matches!(
            stream.timeout(Some(Duration::from_millis(10))).await,
            Err(StreamError::NotConnected)
        ));
        assert!(stream.disconnect().await.is_ok());
    }
    #[tokio::test]
    async fn test_pending_reconnect_outlives_timeout() {
        let config = StreamConfig::with_url("http://127.0.0.1:9").reconnect(ReconnectConfig {
            max_retries: None,
            base_delay_ms: 60_000,
            max_delay_ms: 60_000,
        });
        let mut stream = AtlasStream::with_config(config);
        stream.schedule_reconnect(1);

        for _ in 0..2 {
            assert!(
                stream
                    .timeout(Some(Duration::from_millis(10)))
                    .await
                    .is_ok()
            );
            assert!(stream.is_reconnecting());
        }

        stream.disconnect().await.unwrap();
        assert!(!stream.is_reconnecting());
        assert!(matches!(
            stream.timeout(Some(Duration::from_millis(10))).await,
            Err(StreamError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_reconnect_gives_up_after_max_retries() {
        let config = StreamConfig::with_url("http://127.0.0.1:9").reconnect(ReconnectConfig {
            max_retries: Some(0),
            ..ReconnectConfig::default()
        });
        let mut stream = AtlasStream::with_config(config);
        stream.schedule_reconnect(1);

        assert!(matches!(
            stream.timeout(Some(Duration::from_secs(1))).await,
            Err(StreamError::ReconnectExhausted(0))
        ));
        assert!(!stream.is_reconnecting());
    }
}
