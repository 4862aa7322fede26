//! Inbound stream events and their defensive decoding.

use serde::Serialize;
use serde_json::Value;

use crate::value::{count_field, display_text, number_field, raw_str_field, str_field};

/// Tool name used when a tool event omits one.
pub const UNNAMED_TOOL: &str = "tool";

/// Artifact kind carrying a unified or apply-patch style diff.
pub const FILE_DIFF_ARTIFACT: &str = "file_diff";

/// Structured artifact attached to a tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolArtifact {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
}

impl ToolArtifact {
    #[must_use]
    pub fn file_diff(patch: impl Into<String>) -> Self {
        Self {
            kind: FILE_DIFF_ARTIFACT.to_string(),
            patch: Some(patch.into()),
            summary: None,
        }
    }

    pub fn is_file_diff(&self) -> bool {
        self.kind == FILE_DIFF_ARTIFACT
    }

    fn from_value(value: &Value) -> Option<Self> {
        let kind = str_field(value, "kind")?;
        Some(Self {
            kind,
            patch: raw_str_field(value, "patch"),
            summary: value.get("summary").filter(|v| !v.is_null()).cloned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    InProgress,
    Completed,
}

impl PlanStatus {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("completed" | "complete" | "done") => Self::Completed,
            Some("in_progress" | "in-progress" | "active") => Self::InProgress,
            _ => Self::Pending,
        }
    }
}

/// One checklist entry of a plan update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanItem {
    pub step: String,
    pub status: PlanStatus,
}

impl PlanItem {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(step) if !step.trim().is_empty() => Some(Self {
                step: step.trim().to_string(),
                status: PlanStatus::Pending,
            }),
            Value::Object(_) => Some(Self {
                step: str_field(value, "step")?,
                status: PlanStatus::parse(value.get("status").and_then(Value::as_str)),
            }),
            _ => None,
        }
    }
}

/// Token usage reported on completion.
///
/// Absent fields stay absent: `None` means "not reported", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl TokenUsage {
    /// Builds a summary from a completion payload, or `None` when the payload
    /// reports nothing at all.
    ///
    /// `total_tokens` is derived as input + output only when both are present
    /// and no total was supplied.
    pub fn from_completion(payload: &Value) -> Option<Self> {
        let usage = payload.get("usage").cloned().unwrap_or(Value::Null);
        let input_tokens = count_field(&usage, "inputTokens");
        let output_tokens = count_field(&usage, "outputTokens");
        let total_tokens = count_field(&usage, "totalTokens").or(match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });
        let summary = Self {
            input_tokens,
            output_tokens,
            total_tokens,
            cost_usd: number_field(payload, "costUsd"),
            finish_reason: str_field(payload, "finishReason"),
        };
        (!summary.is_empty()).then_some(summary)
    }

    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none()
            && self.output_tokens.is_none()
            && self.total_tokens.is_none()
            && self.cost_usd.is_none()
            && self.finish_reason.is_none()
    }
}

/// A pending request for human approval of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub call_id: String,
    pub tool_name: String,
    pub args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// One event from the session stream.
///
/// Decoding never fails: a payload that is not an object, or a name this
/// client does not understand, becomes [`StreamEvent::Unknown`]. Missing
/// optional fields take neutral defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    AssistantDelta {
        message_id: Option<String>,
        delta: String,
    },
    ToolCall {
        name: String,
        call_id: Option<String>,
        args: Value,
    },
    ToolDelta {
        name: String,
        call_id: Option<String>,
        channel: String,
        delta: String,
    },
    ToolResult {
        name: String,
        call_id: Option<String>,
        result: Value,
        artifact: Option<ToolArtifact>,
        error: Option<String>,
        args: Option<Value>,
    },
    ReasoningDelta {
        message_id: Option<String>,
        delta: String,
    },
    PlanUpdated {
        items: Vec<PlanItem>,
        note: Option<String>,
    },
    ApprovalRequired(ApprovalRequest),
    Completed {
        message_id: Option<String>,
        usage: Option<TokenUsage>,
    },
    Error {
        message: String,
    },
    Unknown {
        name: String,
        payload: Value,
    },
}

impl StreamEvent {
    /// Decodes one frame given its event name and raw `data` text.
    pub fn decode(name: &str, data: &str) -> Self {
        match serde_json::from_str::<Value>(data) {
            Ok(payload) => Self::from_parts(name, payload),
            Err(_) if name == "error" && !data.trim().is_empty() => Self::Error {
                message: data.trim().to_string(),
            },
            Err(_) => Self::Unknown {
                name: name.to_string(),
                payload: Value::String(data.to_string()),
            },
        }
    }

    /// Decodes an event from its name and an already-parsed payload.
    pub fn from_parts(name: &str, payload: Value) -> Self {
        if name == "error" {
            return Self::Error {
                message: error_message(&payload),
            };
        }
        if !payload.is_object() {
            return Self::Unknown {
                name: name.to_string(),
                payload,
            };
        }

        match name {
            "message.part.delta" => Self::AssistantDelta {
                message_id: str_field(&payload, "messageId"),
                delta: raw_str_field(&payload, "delta").unwrap_or_default(),
            },
            "reasoning.delta" => Self::ReasoningDelta {
                message_id: str_field(&payload, "messageId"),
                delta: raw_str_field(&payload, "delta").unwrap_or_default(),
            },
            "tool.call" => Self::ToolCall {
                name: tool_name(&payload, "name"),
                call_id: str_field(&payload, "callId"),
                args: payload.get("args").cloned().unwrap_or(Value::Null),
            },
            "tool.delta" => Self::ToolDelta {
                name: tool_name(&payload, "name"),
                call_id: str_field(&payload, "callId"),
                channel: str_field(&payload, "channel").unwrap_or_else(|| "output".to_string()),
                delta: payload.get("delta").map(display_text).unwrap_or_default(),
            },
            "tool.result" => Self::ToolResult {
                name: tool_name(&payload, "name"),
                call_id: str_field(&payload, "callId"),
                result: payload.get("result").cloned().unwrap_or(Value::Null),
                artifact: payload.get("artifact").and_then(ToolArtifact::from_value),
                error: str_field(&payload, "error"),
                args: payload.get("args").filter(|v| !v.is_null()).cloned(),
            },
            "plan.updated" => Self::PlanUpdated {
                items: payload
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(PlanItem::from_value).collect())
                    .unwrap_or_default(),
                note: str_field(&payload, "note"),
            },
            "tool.approval.required" => match str_field(&payload, "callId") {
                Some(call_id) => Self::ApprovalRequired(ApprovalRequest {
                    call_id,
                    tool_name: tool_name(&payload, "toolName"),
                    args: payload.get("args").cloned().unwrap_or(Value::Null),
                    message_id: str_field(&payload, "messageId"),
                }),
                // Without a correlation id the decision could never be reported.
                None => Self::Unknown {
                    name: name.to_string(),
                    payload,
                },
            },
            "message.completed" => Self::Completed {
                message_id: str_field(&payload, "id").or_else(|| str_field(&payload, "messageId")),
                usage: TokenUsage::from_completion(&payload),
            },
            _ => Self::Unknown {
                name: name.to_string(),
                payload,
            },
        }
    }

    /// Short stable label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssistantDelta { .. } => "assistant-delta",
            Self::ToolCall { .. } => "tool-call",
            Self::ToolDelta { .. } => "tool-delta",
            Self::ToolResult { .. } => "tool-result",
            Self::ReasoningDelta { .. } => "reasoning-delta",
            Self::PlanUpdated { .. } => "plan-update",
            Self::ApprovalRequired(_) => "approval-required",
            Self::Completed { .. } => "completion",
            Self::Error { .. } => "error",
            Self::Unknown { .. } => "unknown",
        }
    }
}

fn tool_name(payload: &Value, key: &str) -> String {
    str_field(payload, key).unwrap_or_else(|| UNNAMED_TOOL.to_string())
}

/// Message for an `error` event: a plain string payload or `error` field is
/// used verbatim; otherwise `error`, `message`, and any `details` are joined.
fn error_message(payload: &Value) -> String {
    if let Value::String(text) = payload {
        return text.clone();
    }
    if let Some(text) = payload.get("error").and_then(Value::as_str) {
        return text.to_string();
    }

    let mut parts = Vec::new();
    if let Some(nested) = payload.get("error").filter(|v| v.is_object()) {
        if let Some(message) = str_field(nested, "message") {
            parts.push(message);
        }
    }
    if let Some(message) = str_field(payload, "message") {
        parts.push(message);
    }
    if let Some(details) = payload.get("details").filter(|v| !v.is_null()) {
        parts.push(format!("Details: {details}"));
    }

    if parts.is_empty() {
        match payload {
            Value::Object(map) if map.is_empty() => "Unknown error".to_string(),
            Value::Null => "Unknown error".to_string(),
            other => other.to_string(),
        }
    } else {
        parts.join(" ")
    }
}
