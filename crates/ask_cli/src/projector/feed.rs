use std::io::{self, Write};
use std::time::Duration;

use serde_json::{json, Map, Value};

use ask_protocol::SessionHandshake;

use crate::correlator::{now_ms, RunState};
use crate::projector::{Observation, Projector, RunFailure, Sink};

/// Keys written even when null.
const ALWAYS_PRESENT: &[&str] = &["args", "result"];

/// Writes one compact JSON object per line, flushed as each event happens.
pub struct FeedProjector {
    out: Sink,
}

impl FeedProjector {
    pub fn new(out: Sink) -> Self {
        Self { out }
    }

    fn emit(&mut self, event: &str, ts: u64, fields: Value) -> io::Result<()> {
        let mut line = Map::new();
        line.insert("event".to_string(), Value::from(event));
        line.insert("ts".to_string(), Value::from(ts));
        if let Value::Object(fields) = fields {
            line.extend(
                fields
                    .into_iter()
                    .filter(|(key, value)| !value.is_null() || ALWAYS_PRESENT.contains(&key.as_str())),
            );
        }
        let text = serde_json::to_string(&Value::Object(line)).map_err(io::Error::other)?;
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }
}

/// Renders one observation as `(event name, ts, fields)`. Null fields other
/// than [`ALWAYS_PRESENT`] are dropped by the caller, so optional values can
/// be passed through as-is.
fn feed_line(observation: &Observation<'_>) -> (&'static str, u64, Value) {
    match *observation {
        Observation::AssistantText {
            message_id,
            delta,
            ts,
        } => (
            "assistant.delta",
            ts,
            json!({"messageId": message_id, "delta": delta}),
        ),
        Observation::Reasoning {
            message_id,
            delta,
            ts,
        } => (
            "reasoning.delta",
            ts,
            json!({"messageId": message_id, "delta": delta}),
        ),
        Observation::ToolCall(call) => (
            "tool.call",
            call.ts,
            json!({"name": call.name, "callId": call.call_id, "args": call.args}),
        ),
        Observation::ToolOutput {
            name,
            call_id,
            channel,
            delta,
            ts,
        } => (
            "tool.delta",
            ts,
            json!({"name": name, "callId": call_id, "channel": channel, "delta": delta}),
        ),
        Observation::ToolResult { record, .. } => (
            "tool.result",
            record.ts,
            json!({
                "name": record.name,
                "callId": record.call_id,
                "durationMs": record.duration_ms,
                "result": record.result,
                "artifact": record.artifact,
                "isError": record.is_error,
                "error": record.error,
            }),
        ),
        Observation::Plan { items, note, ts } => (
            "plan.updated",
            ts,
            json!({"items": items, "note": note}),
        ),
        Observation::ApprovalPending { request, ts } => (
            "approval.required",
            ts,
            json!({"callId": request.call_id, "toolName": request.tool_name, "args": request.args}),
        ),
        Observation::ApprovalResolved {
            request,
            decision,
            automatic,
            ts,
            ..
        } => (
            "approval.resolved",
            ts,
            json!({"callId": request.call_id, "approved": decision.approved(), "auto": automatic}),
        ),
        Observation::Completed {
            message_id,
            usage,
            ts,
        } => (
            "assistant.completed",
            ts,
            json!({"messageId": message_id, "usage": usage}),
        ),
        Observation::StreamError { message, ts } => ("error", ts, json!({"error": message})),
    }
}

impl Projector for FeedProjector {
    fn begin(&mut self, _handshake: &SessionHandshake) -> io::Result<()> {
        Ok(())
    }

    fn observe(&mut self, observation: &Observation<'_>, _state: &RunState) -> io::Result<()> {
        let (event, ts, fields) = feed_line(observation);
        self.emit(event, ts, fields)
    }

    fn finish(&mut self, _state: &RunState, _elapsed: Duration) -> io::Result<()> {
        self.out.flush()
    }

    fn fail(&mut self, failure: &RunFailure) -> io::Result<()> {
        self.emit(
            "error",
            now_ms(),
            json!({"error": failure.message, "sessionId": failure.session_id}),
        )
    }
}
