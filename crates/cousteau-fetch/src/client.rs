//! HTTP request executor for the Atlas API.

use std::time::Duration;

use cousteau_types::{CousteauError, Payload};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy, RequestBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Default API server.
pub const DEFAULT_BASE_URL: &str = "https://atlas.ripe.net";

/// Returns the user agent sent when none is configured.
#[must_use]
pub fn default_user_agent() -> String {
    format!("RIPE ATLAS Cousteau v{}", env!("CARGO_PKG_VERSION"))
}

/// Configuration for the API client.
///
/// Proxies not listed here are still picked up from the standard
/// `http_proxy`/`https_proxy`/`all_proxy` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host every request path is appended to.
    pub base_url: String,
    /// API key sent as the `key` query parameter.
    pub key: Option<String>,
    /// User agent string.
    pub user_agent: String,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
    /// Proxy URLs applied to all schemes.
    pub proxies: Vec<String>,
    /// Verify the server's TLS certificate.
    pub verify: bool,
    /// Request timeout; none by default.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            key: None,
            user_agent: default_user_agent(),
            headers: Vec::new(),
            proxies: Vec::new(),
            verify: true,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration talking HTTPS to the given host.
    #[must_use]
    pub fn with_server(server: &str) -> Self {
        Self {
            base_url: format!("https://{server}"),
            ..Self::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a proxy.
    #[must_use]
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxies.push(url.into());
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Errors returned by the request executor.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request did not produce a response (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a not-ok status.
    #[error("Server responded with {status}: {payload}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Decoded response body.
        payload: Payload,
    },

    /// A configured header is not a valid HTTP header.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// Returns the response body, if the server answered.
    #[must_use]
    pub const fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Status { payload, .. } => Some(payload),
            Self::Transport(_) | Self::InvalidHeader(_) => None,
        }
    }
}

impl From<ApiError> for CousteauError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Transport(e) => Self::Http(e.to_string()),
            ApiError::Status { payload, .. } => Self::ApiResponse(payload),
            ApiError::InvalidHeader(message) => Self::Generic(message),
        }
    }
}

/// Executes GET/POST/DELETE calls against the API.
///
/// Every call ends in either the decoded body of an ok response or an
/// [`ApiError`]; failures are never retried.
#[derive(Debug, Clone)]
pub struct AtlasClient {
    client: Client,
    config: ClientConfig,
}

impl AtlasClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a header or proxy is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(header_name, header_value);
        }

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .danger_accept_invalid_certs(!config.verify);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        for proxy in &config.proxies {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, ApiError> {
        Self::new(ClientConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Makes a GET request, merging `params` into the query string.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a not-ok status.
    pub async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Payload, ApiError> {
        let request = self.request(Method::GET, path).query(params);
        self.execute(Method::GET, path, request).await
    }

    /// Makes a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a not-ok status.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Payload, ApiError> {
        let request = self.request(Method::POST, path).json(body);
        self.execute(Method::POST, path, request).await
    }

    /// Makes a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a not-ok status.
    pub async fn delete(&self, path: &str) -> Result<Payload, ApiError> {
        let request = self.request(Method::DELETE, path);
        self.execute(Method::DELETE, path, request).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.config.key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Payload, ApiError> {
        debug!(%method, path, "sending request");
        let response = request.send().await?;
        let status = response.status();
        let payload = Payload::from_body(response.text().await?);
        debug!(%method, path, status = status.as_u16(), "received response");

        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                payload,
            });
        }
        Ok(payload)
    }
}
