use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use ask_protocol::{ClientError, HandshakeDecodeError};

#[derive(Debug, thiserror::Error)]
pub enum SessionApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),
    #[error("HTTP {status} {message}")]
    Status { status: StatusCode, message: String },
    #[error("invalid response body: {0}")]
    Body(#[source] serde_json::Error),
    #[error(transparent)]
    Handshake(#[from] HandshakeDecodeError),
    #[error("retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
    #[error("request was cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for SessionApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl SessionApiError {
    /// Maps a handshake-stage failure onto the transport-neutral error.
    pub fn into_handshake_error(self) -> ClientError {
        match self {
            Self::Cancelled => ClientError::Cancelled,
            other => ClientError::Handshake(other.to_string()),
        }
    }

    /// Maps a stream-stage failure onto the transport-neutral error.
    pub fn into_transport_error(self) -> ClientError {
        match self {
            Self::Cancelled => ClientError::Cancelled,
            other => ClientError::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<Value>,
    message: Option<String>,
}

/// Extracts a readable message from a failed response body.
///
/// Understands `{"error": "..."}`, `{"error": {"message": "..."}}`, and
/// `{"message": "..."}`; otherwise falls back to the raw body, then to the
/// canonical status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.trim().to_string()
        }
    };

    let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) else {
        return fallback();
    };

    let from_error = match &payload.error {
        Some(Value::String(message)) => Some(message.clone()),
        Some(Value::Object(fields)) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        _ => None,
    };

    from_error
        .or(payload.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(fallback)
}
