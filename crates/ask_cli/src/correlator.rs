//! Event correlator: folds the ordered event stream of one run into
//! [`RunState`] and forwards each change to the active projector.
//!
//! Only events for the handshake's assistant message contribute text and end
//! the run. Tool results are paired with earlier calls by correlation id to
//! compute durations; a second result for the same id is kept but flagged.

use std::collections::{HashMap, HashSet};
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::debug;

use ask_protocol::{
    AssistantChunk, PlanItem, SessionHandshake, StreamErrorRecord, StreamEvent, Timestamp,
    TokenUsage, ToolArtifact, ToolCallRecord, ToolResultRecord,
};

use crate::approval::ApprovalGate;
use crate::projector::{Observation, Projector};
use crate::tool_policy::{error_message, files_from_patch, is_error_result, FINISH_TOOL};

/// Wall-clock epoch milliseconds.
pub fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Timestamp::try_from(elapsed.as_millis()).unwrap_or(Timestamp::MAX))
        .unwrap_or(0)
}

/// Whether the run should keep reading the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The handshake's assistant message completed.
    Complete,
}

/// Everything one run has accumulated so far.
#[derive(Debug, Clone)]
pub struct RunState {
    pub handshake: SessionHandshake,
    pub prompt: String,
    pub started_at: Timestamp,
    /// Concatenated assistant text, in arrival order.
    pub output: String,
    pub chunks: Vec<AssistantChunk>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub tool_results: Vec<ToolResultRecord>,
    /// Paths touched by tools, in first-seen order.
    pub files_touched: Vec<String>,
    pub plan: Vec<PlanItem>,
    pub usage: Option<TokenUsage>,
    /// The agent called its finish tool.
    pub finish_seen: bool,
    pub completed: bool,
    pub errors: Vec<StreamErrorRecord>,
    call_index: HashMap<String, usize>,
    answered: HashSet<String>,
}

impl RunState {
    pub fn new(handshake: SessionHandshake, prompt: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            handshake,
            prompt: prompt.into(),
            started_at,
            output: String::new(),
            chunks: Vec::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            files_touched: Vec::new(),
            plan: Vec::new(),
            usage: None,
            finish_seen: false,
            completed: false,
            errors: Vec::new(),
            call_index: HashMap::new(),
            answered: HashSet::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.handshake.session_id
    }

    pub fn assistant_message_id(&self) -> &str {
        &self.handshake.assistant_message_id
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.usage
            .as_ref()
            .and_then(|usage| usage.finish_reason.as_deref())
    }

    /// The earlier call with `call_id`, if any.
    pub fn call_for(&self, call_id: &str) -> Option<&ToolCallRecord> {
        self.call_index
            .get(call_id)
            .and_then(|index| self.tool_calls.get(*index))
    }

    fn touch(&mut self, path: &str) {
        let path = path.trim();
        if !path.is_empty() && !self.files_touched.iter().any(|known| known == path) {
            self.files_touched.push(path.to_string());
        }
    }

    fn touch_from_result(&mut self, name: &str, result: &Value, artifact: Option<&ToolArtifact>) {
        if let Some(patch) = artifact
            .filter(|artifact| artifact.is_file_diff())
            .and_then(|artifact| artifact.patch.as_deref())
        {
            for path in files_from_patch(patch) {
                self.touch(&path);
            }
        }
        if name == "write" {
            if let Some(path) = result.get("path").and_then(Value::as_str) {
                self.touch(path);
            }
        }
    }
}

pub struct Correlator {
    state: RunState,
    gate: ApprovalGate,
    projector: Box<dyn Projector>,
}

impl Correlator {
    pub fn new(state: RunState, gate: ApprovalGate, projector: Box<dyn Projector>) -> Self {
        Self {
            state,
            gate,
            projector,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    pub fn handle(&mut self, event: StreamEvent) -> io::Result<Flow> {
        self.handle_at(event, now_ms())
    }

    /// Applies one event observed at `ts`.
    pub fn handle_at(&mut self, event: StreamEvent, ts: Timestamp) -> io::Result<Flow> {
        debug!(kind = event.kind(), "stream event");
        match event {
            StreamEvent::AssistantDelta { message_id, delta } => {
                if message_id.as_deref() != Some(self.state.assistant_message_id()) || delta.is_empty() {
                    return Ok(Flow::Continue);
                }
                self.state.output.push_str(&delta);
                self.state.chunks.push(AssistantChunk { ts, delta });
                let index = self.state.chunks.len() - 1;
                let chunk = &self.state.chunks[index];
                self.projector.observe(
                    &Observation::AssistantText {
                        message_id: &self.state.handshake.assistant_message_id,
                        delta: &chunk.delta,
                        ts,
                    },
                    &self.state,
                )?;
            }
            StreamEvent::ReasoningDelta { message_id, delta } => {
                let foreign = message_id
                    .as_deref()
                    .is_some_and(|id| id != self.state.assistant_message_id());
                if foreign || delta.is_empty() {
                    return Ok(Flow::Continue);
                }
                self.projector.observe(
                    &Observation::Reasoning {
                        message_id: message_id.as_deref(),
                        delta: &delta,
                        ts,
                    },
                    &self.state,
                )?;
            }
            StreamEvent::ToolCall {
                name,
                call_id,
                args,
            } => {
                let index = self.state.tool_calls.len();
                if let Some(id) = &call_id {
                    self.state.call_index.insert(id.clone(), index);
                }
                self.state.tool_calls.push(ToolCallRecord {
                    name,
                    call_id,
                    args,
                    ts,
                });
                let record = &self.state.tool_calls[index];
                self.projector
                    .observe(&Observation::ToolCall(record), &self.state)?;
            }
            StreamEvent::ToolDelta {
                name,
                call_id,
                channel,
                delta,
            } => {
                if delta.is_empty() {
                    return Ok(Flow::Continue);
                }
                self.projector.observe(
                    &Observation::ToolOutput {
                        name: &name,
                        call_id: call_id.as_deref(),
                        channel: &channel,
                        delta: &delta,
                        ts,
                    },
                    &self.state,
                )?;
            }
            StreamEvent::ToolResult {
                name,
                call_id,
                result,
                artifact,
                error,
                args,
            } => {
                self.record_result(name, call_id, result, artifact, error, args, ts)?;
            }
            StreamEvent::PlanUpdated { items, note } => {
                self.state.plan = items;
                self.projector.observe(
                    &Observation::Plan {
                        items: &self.state.plan,
                        note: note.as_deref(),
                        ts,
                    },
                    &self.state,
                )?;
            }
            StreamEvent::ApprovalRequired(request) => {
                self.projector
                    .observe(&Observation::ApprovalPending { request: &request, ts }, &self.state)?;
                let outcome = self.gate.resolve(&request);
                debug!(
                    call_id = %request.call_id,
                    tool = %request.tool_name,
                    approved = outcome.approved(),
                    prompted = outcome.prompted,
                    "approval resolved"
                );
                self.projector.observe(
                    &Observation::ApprovalResolved {
                        request: &request,
                        decision: outcome.decision,
                        prompted: outcome.prompted,
                        automatic: outcome.automatic,
                        ts: now_ms().max(ts),
                    },
                    &self.state,
                )?;
            }
            StreamEvent::Completed { message_id, usage } => {
                if message_id.as_deref() != Some(self.state.assistant_message_id()) {
                    debug!(?message_id, "completion for another message ignored");
                    return Ok(Flow::Continue);
                }
                self.state.usage = usage;
                self.state.completed = true;
                self.projector.observe(
                    &Observation::Completed {
                        message_id: &self.state.handshake.assistant_message_id,
                        usage: self.state.usage.as_ref(),
                        ts,
                    },
                    &self.state,
                )?;
                return Ok(Flow::Complete);
            }
            StreamEvent::Error { message } => {
                self.state.errors.push(StreamErrorRecord { ts, error: message });
                let index = self.state.errors.len() - 1;
                self.projector.observe(
                    &Observation::StreamError {
                        message: &self.state.errors[index].error,
                        ts,
                    },
                    &self.state,
                )?;
            }
            StreamEvent::Unknown { name, .. } => {
                debug!(event = %name, "unknown stream event ignored");
            }
        }
        Ok(Flow::Continue)
    }

    #[allow(clippy::too_many_arguments)]
    fn record_result(
        &mut self,
        name: String,
        call_id: Option<String>,
        result: Value,
        artifact: Option<ToolArtifact>,
        error: Option<String>,
        args: Option<Value>,
        ts: Timestamp,
    ) -> io::Result<()> {
        let call_ts = call_id
            .as_deref()
            .and_then(|id| self.state.call_for(id))
            .map(|call| call.ts);
        let duration_ms = call_ts.map(|started| ts.saturating_sub(started));
        let duplicate = call_id
            .as_ref()
            .is_some_and(|id| !self.state.answered.insert(id.clone()));
        let is_error = is_error_result(&name, &result, error.as_deref());
        let error = is_error.then(|| error_message(&result, error.as_deref()));

        if !duplicate {
            self.state.touch_from_result(&name, &result, artifact.as_ref());
        }
        if name == FINISH_TOOL {
            self.state.finish_seen = true;
        }

        let index = self.state.tool_results.len();
        self.state.tool_results.push(ToolResultRecord {
            name,
            call_id,
            result,
            artifact,
            ts,
            duration_ms,
            is_error,
            error,
            duplicate,
        });
        let record = &self.state.tool_results[index];
        let args = args.as_ref().or_else(|| {
            record
                .call_id
                .as_deref()
                .and_then(|id| self.state.call_for(id))
                .map(|call| &call.args)
        });
        self.projector
            .observe(&Observation::ToolResult { record, args }, &self.state)
    }

    pub fn finish(&mut self, elapsed: Duration) -> io::Result<()> {
        self.projector.finish(&self.state, elapsed)
    }

    pub fn projector_mut(&mut self) -> &mut dyn Projector {
        self.projector.as_mut()
    }
}
