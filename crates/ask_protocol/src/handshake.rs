use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::str_field;

/// Body of the "start or resume a session" request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Continue the most recently used session.
    pub last: bool,
    /// Asks the server to shape its output for machine consumers.
    pub json_mode: bool,
    pub auto_approve: bool,
}

impl AskRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Whether the handshake created a session or attached to an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOrigin {
    Created,
    Resumed,
}

/// Identifiers for one run, received once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandshake {
    pub session_id: String,
    pub assistant_message_id: String,
    pub agent: String,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<SessionOrigin>,
}

/// The handshake response lacked a required identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeDecodeError {
    pub missing: &'static str,
}

impl std::fmt::Display for HandshakeDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handshake response is missing `{}`", self.missing)
    }
}

impl std::error::Error for HandshakeDecodeError {}

impl SessionHandshake {
    /// Reads a handshake response body.
    ///
    /// `sessionId` and `assistantMessageId` are required. Agent, provider,
    /// and model prefer the `header` block and fall back to the top-level
    /// fields, then to empty strings.
    pub fn from_response(body: &Value) -> Result<Self, HandshakeDecodeError> {
        let header = body.get("header").cloned().unwrap_or(Value::Null);
        let session_id = str_field(body, "sessionId")
            .or_else(|| str_field(&header, "sessionId"))
            .ok_or(HandshakeDecodeError {
                missing: "sessionId",
            })?;
        let assistant_message_id =
            str_field(body, "assistantMessageId").ok_or(HandshakeDecodeError {
                missing: "assistantMessageId",
            })?;
        let resolve = |key: &str| {
            str_field(&header, key)
                .or_else(|| str_field(body, key))
                .unwrap_or_default()
        };
        let origin = body
            .get("message")
            .and_then(|message| message.get("kind"))
            .and_then(Value::as_str)
            .and_then(|kind| match kind {
                "created" => Some(SessionOrigin::Created),
                "last" | "resumed" => Some(SessionOrigin::Resumed),
                _ => None,
            });

        Ok(Self {
            session_id,
            assistant_message_id,
            agent: resolve("agent"),
            provider: resolve("provider"),
            model: resolve("model"),
            origin,
        })
    }
}
