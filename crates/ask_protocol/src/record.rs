//! Run records accumulated while a stream is consumed.

use serde::Serialize;
use serde_json::Value;

use crate::event::ToolArtifact;

/// Wall-clock milliseconds since the Unix epoch.
pub type Timestamp = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub args: Value,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ToolArtifact>,
    pub ts: Timestamp,
    /// Result timestamp minus the matching call timestamp, clamped at zero.
    /// Absent when no earlier call carried the same correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// A later result for a correlation id that was already answered.
    #[serde(skip)]
    pub duplicate: bool,
}

/// A stream-level `error` event; the run keeps going after one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamErrorRecord {
    pub ts: Timestamp,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantChunk {
    pub ts: Timestamp,
    pub delta: String,
}

/// Outcome of one approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    ApproveOnce,
    Deny,
    /// Approve, and auto-approve everything for the rest of the run.
    Always,
}

impl ApprovalDecision {
    pub fn approved(self) -> bool {
        !matches!(self, Self::Deny)
    }
}
