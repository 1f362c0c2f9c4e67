//! Remote call failures and their user-facing messages.
//!
//! ERROR HANDLING
//! ==============
//! Error bodies are decoded once, at the HTTP edge, into the closed
//! [`ErrorBody`] set. Message selection then only matches on the variant.
//! Precedence when a JSON object carries several known fields:
//! `detail`, then `mensaje`, then `error`.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Normalized shape of a non-success response body.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorBody {
    /// Object with a `detail` field.
    Detail(String),
    /// Object with a `mensaje` field.
    Mensaje(String),
    /// Object with an `error` field.
    Error(String),
    /// Body that was a plain string (JSON string or non-JSON text).
    Text(String),
    /// Any other JSON payload, e.g. field-level validation errors.
    Unrecognized(serde_json::Value),
}

impl ErrorBody {
    /// Decode a raw response body. Returns `None` for an empty body.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => Self::from_value(value),
            Err(_) => Some(Self::Text(raw.to_owned())),
        }
    }

    /// Classify an already-parsed JSON body.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(Self::Text(s)),
            serde_json::Value::Object(map) => {
                if let Some(detail) = map.get("detail").and_then(string_form) {
                    Some(Self::Detail(detail))
                } else if let Some(mensaje) = map.get("mensaje").and_then(string_form) {
                    Some(Self::Mensaje(mensaje))
                } else if let Some(error) = map.get("error").and_then(string_form) {
                    Some(Self::Error(error))
                } else {
                    Some(Self::Unrecognized(serde_json::Value::Object(map)))
                }
            }
            other => Some(Self::Unrecognized(other)),
        }
    }

    /// Display message carried by this body, if it has a recognized shape.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Detail(m) | Self::Mensaje(m) | Self::Error(m) | Self::Text(m) => Some(m),
            Self::Unrecognized(_) => None,
        }
    }
}

/// String form of a field value. Empty, null and `false` count as absent.
fn string_form(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Failure of a call to the auth or tracking service.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No response was received (connect, timeout, TLS, ...).
    #[error("{0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("request failed with status code {status}")]
    Status { status: u16, body: Option<ErrorBody> },

    /// The service answered with success but the body could not be parsed.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Build a status error from a raw response body.
    #[must_use]
    pub fn status(status: u16, raw_body: &str) -> Self {
        Self::Status { status, body: ErrorBody::decode(raw_body) }
    }

    /// Single display message for this failure.
    ///
    /// A recognized body wins; a failure with no body falls back to its own
    /// message; an unrecognized body falls back to `default`.
    #[must_use]
    pub fn user_message(&self, default: &str) -> String {
        match self {
            Self::Status { body: Some(body), .. } => body.message().unwrap_or(default).to_owned(),
            Self::Status { body: None, .. } | Self::Transport(_) | Self::Decode(_) => {
                let message = self.to_string();
                if message.trim().is_empty() { default.to_owned() } else { message }
            }
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { Self::Decode(err.to_string()) } else { Self::Transport(err.to_string()) }
    }
}
