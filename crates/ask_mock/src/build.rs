//! Shorthand constructors for stream events.

use serde_json::Value;

use ask_protocol::{ApprovalRequest, PlanItem, StreamEvent, TokenUsage, ToolArtifact};

pub fn assistant_delta(message_id: &str, delta: &str) -> StreamEvent {
    StreamEvent::AssistantDelta {
        message_id: Some(message_id.to_string()),
        delta: delta.to_string(),
    }
}

pub fn reasoning_delta(message_id: &str, delta: &str) -> StreamEvent {
    StreamEvent::ReasoningDelta {
        message_id: Some(message_id.to_string()),
        delta: delta.to_string(),
    }
}

pub fn tool_call(name: &str, call_id: Option<&str>, args: Value) -> StreamEvent {
    StreamEvent::ToolCall {
        name: name.to_string(),
        call_id: call_id.map(ToString::to_string),
        args,
    }
}

pub fn tool_delta(name: &str, call_id: Option<&str>, channel: &str, delta: &str) -> StreamEvent {
    StreamEvent::ToolDelta {
        name: name.to_string(),
        call_id: call_id.map(ToString::to_string),
        channel: channel.to_string(),
        delta: delta.to_string(),
    }
}

pub fn tool_result(name: &str, call_id: Option<&str>, result: Value) -> StreamEvent {
    StreamEvent::ToolResult {
        name: name.to_string(),
        call_id: call_id.map(ToString::to_string),
        result,
        artifact: None,
        error: None,
        args: None,
    }
}

pub fn tool_result_with_diff(name: &str, call_id: Option<&str>, result: Value, patch: &str) -> StreamEvent {
    StreamEvent::ToolResult {
        name: name.to_string(),
        call_id: call_id.map(ToString::to_string),
        result,
        artifact: Some(ToolArtifact::file_diff(patch)),
        error: None,
        args: None,
    }
}

pub fn tool_error(name: &str, call_id: Option<&str>, error: &str) -> StreamEvent {
    StreamEvent::ToolResult {
        name: name.to_string(),
        call_id: call_id.map(ToString::to_string),
        result: Value::Null,
        artifact: None,
        error: Some(error.to_string()),
        args: None,
    }
}

pub fn plan(items: Vec<PlanItem>) -> StreamEvent {
    StreamEvent::PlanUpdated { items, note: None }
}

pub fn approval_request(call_id: &str, tool_name: &str, args: Value) -> ApprovalRequest {
    ApprovalRequest {
        call_id: call_id.to_string(),
        tool_name: tool_name.to_string(),
        args,
        message_id: None,
    }
}

pub fn approval(call_id: &str, tool_name: &str, args: Value) -> StreamEvent {
    StreamEvent::ApprovalRequired(approval_request(call_id, tool_name, args))
}

pub fn completed(message_id: &str) -> StreamEvent {
    StreamEvent::Completed {
        message_id: Some(message_id.to_string()),
        usage: None,
    }
}

pub fn completed_with_usage(message_id: &str, usage: TokenUsage) -> StreamEvent {
    StreamEvent::Completed {
        message_id: Some(message_id.to_string()),
        usage: Some(usage),
    }
}

pub fn error(message: &str) -> StreamEvent {
    StreamEvent::Error {
        message: message.to_string(),
    }
}
