//! Decoded HTTP response bodies.

use serde_json::Value;

/// The body of an API response.
///
/// The API answers with JSON almost everywhere, but error pages and a few
/// plaintext endpoints do not decode; those bodies are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body decoded as JSON.
    Json(Value),
    /// Body that was not valid JSON.
    Text(String),
}

impl Payload {
    /// Decodes a response body, falling back to raw text.
    #[must_use]
    pub fn from_body(body: String) -> Self {
        serde_json::from_str(&body).map_or(Self::Text(body), Self::Json)
    }

    /// Returns the JSON value, if the body decoded.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Returns the raw text, if the body did not decode.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Consumes the payload, returning the JSON value or `Value::String` for text.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Looks up a top-level field of a JSON object body.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_json().and_then(|value| value.get(key))
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_body_json() {
        let payload = Payload::from_body(r#"{"count": 3}"#.to_string());
        assert_eq!(payload, Payload::Json(json!({"count": 3})));
        assert_eq!(payload.get("count"), Some(&json!(3)));
    }

    #[test]
    fn test_from_body_text() {
        let payload = Payload::from_body("Bad Gateway".to_string());
        assert_eq!(payload.as_text(), Some("Bad Gateway"));
        assert!(payload.as_json().is_none());
        assert_eq!(payload.to_string(), "Bad Gateway");
    }

    #[test]
    fn test_empty_body_is_text() {
        let payload = Payload::from_body(String::new());
        assert_eq!(payload, Payload::Text(String::new()));
    }
}
