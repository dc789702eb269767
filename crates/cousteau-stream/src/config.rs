//! Stream client configuration.

use std::time::Duration;

use crate::StreamError;

/// Default streaming server.
pub const DEFAULT_STREAM_URL: &str = "https://atlas-stream.ripe.net";

/// Default socket.io path on the streaming server.
pub const DEFAULT_STREAM_PATH: &str = "/stream/socket.io/";

/// Reconnection policy applied when the connection drops while waiting for
/// events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Maximum reconnect attempts; `None` retries forever.
    pub max_retries: Option<u32>,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between attempts (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            base_delay_ms: 1_000,
            max_delay_ms: 5_000,
        }
    }
}

impl ReconnectConfig {
    /// Returns the delay before the given attempt (starting at 1): the base
    /// delay doubled per attempt with a deterministic jitter of up to 25%,
    /// never above `max_delay_ms`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp_delay = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
        let capped_delay = exp_delay.min(self.max_delay_ms);

        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            let offset = (u64::from(attempt) * 17) % (jitter_range * 2 + 1);
            offset.cast_signed() - jitter_range.cast_signed()
        } else {
            0
        };

        Duration::from_millis(
            capped_delay
                .saturating_add_signed(jitter)
                .min(self.max_delay_ms),
        )
    }
}

/// Configuration for [`AtlasStream`](crate::AtlasStream).
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Scheme and host of the streaming server; `http(s)` is mapped to `ws(s)`.
    pub base_url: String,
    /// Socket.io path.
    pub path: String,
    /// Extra headers sent with the websocket upgrade request.
    pub headers: Vec<(String, String)>,
    /// User agent string; a `User-Agent` entry in `headers` takes precedence.
    pub user_agent: String,
    /// Proxy URLs by scheme (`http`, `https`).
    pub proxies: Vec<(String, String)>,
    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STREAM_URL.to_string(),
            path: DEFAULT_STREAM_PATH.to_string(),
            headers: Vec::new(),
            user_agent: format!("RIPE ATLAS Cousteau v{}", env!("CARGO_PKG_VERSION")),
            proxies: Vec::new(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Creates a configuration for another streaming server.
    #[must_use]
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Adds a header sent with the upgrade request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a proxy for a scheme.
    #[must_use]
    pub fn proxy(mut self, scheme: impl Into<String>, url: impl Into<String>) -> Self {
        self.proxies.push((scheme.into(), url.into()));
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub const fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Returns the websocket URL of the socket.io endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidUrl`] if the base URL has no supported scheme.
    pub fn socket_url(&self) -> Result<String, StreamError> {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(host) = base.strip_prefix("https://") {
            format!("wss://{host}")
        } else if let Some(host) = base.strip_prefix("http://") {
            format!("ws://{host}")
        } else if base.starts_with("wss://") || base.starts_with("ws://") {
            base.to_string()
        } else {
            return Err(StreamError::InvalidUrl(self.base_url.clone()));
        };
        Ok(format!("{base}{}?EIO=4&transport=websocket", self.path))
    }

    /// Returns the proxy that applies to the stream connection: an explicit
    /// one first, then `http_proxy`/`https_proxy` from the environment.
    #[must_use]
    pub fn proxy_url(&self) -> Option<String> {
        self.proxies
            .iter()
            .find(|(scheme, _)| scheme == "http" || scheme == "https")
            .map(|(_, url)| url.clone())
            .or_else(|| {
                ["http_proxy", "https_proxy"]
                    .into_iter()
                    .find_map(|name| std::env::var(name).ok())
            })
            .filter(|url| !url.is_empty())
    }
}
