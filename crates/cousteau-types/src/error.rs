//! Error types for cousteau.

use std::fmt;

use thiserror::Error;

use crate::Payload;

/// Result type alias for cousteau operations.
pub type Result<T> = std::result::Result<T, CousteauError>;

/// Errors raised by the listing iterator, entity fetcher and payload builders.
#[derive(Error, Debug)]
pub enum CousteauError {
    /// Local configuration error, e.g. neither an id nor metadata was given.
    #[error("{0}")]
    Generic(String),

    /// The API answered with a non-success response.
    #[error("API response error: {0}")]
    ApiResponse(Payload),

    /// The request never produced a response (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(String),

    /// A probe source failed validation.
    #[error("Malformed source: {0}")]
    MalformedSource(Violations),

    /// A measurement definition failed validation.
    #[error("Malformed measurement: {0}")]
    MalformedMeasurement(Violations),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The list of rules a payload broke, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    /// Creates an empty violation list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Records a violation.
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Returns true if nothing was violated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the violation messages.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// Converts into `Ok(())` when empty, `Err(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the violations themselves if there are any.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}
