//! Output projectors: one per output mode.
//!
//! The correlator hands every state change to exactly one [`Projector`]. The
//! modes are mutually exclusive, so a run never writes two formats to the
//! same sink.

use std::io::{self, Write};
use std::time::Duration;

use serde_json::Value;

use ask_protocol::{
    ApprovalDecision, ApprovalRequest, PlanItem, SessionHandshake, Timestamp, TokenUsage,
    ToolCallRecord, ToolResultRecord,
};

use crate::correlator::RunState;

pub mod feed;
pub mod interactive;
pub mod transcript;

pub use feed::FeedProjector;
pub use interactive::{InteractiveProjector, RenderOptions};
pub use transcript::TranscriptProjector;

/// Output sink handed to projectors; stdout or stderr in production.
pub type Sink = Box<dyn Write + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable live rendering.
    Interactive,
    /// One JSON document after completion.
    Transcript { verbose: bool },
    /// One JSON object per line as events happen.
    Feed,
}

impl OutputMode {
    pub fn is_json(self) -> bool {
        !matches!(self, Self::Interactive)
    }
}

/// One state change, borrowed from the run state that recorded it.
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    AssistantText {
        message_id: &'a str,
        delta: &'a str,
        ts: Timestamp,
    },
    Reasoning {
        message_id: Option<&'a str>,
        delta: &'a str,
        ts: Timestamp,
    },
    ToolCall(&'a ToolCallRecord),
    ToolOutput {
        name: &'a str,
        call_id: Option<&'a str>,
        channel: &'a str,
        delta: &'a str,
        ts: Timestamp,
    },
    ToolResult {
        record: &'a ToolResultRecord,
        /// Arguments from the result event, else from the matching call.
        args: Option<&'a Value>,
    },
    Plan {
        items: &'a [PlanItem],
        note: Option<&'a str>,
        ts: Timestamp,
    },
    ApprovalPending {
        request: &'a ApprovalRequest,
        ts: Timestamp,
    },
    ApprovalResolved {
        request: &'a ApprovalRequest,
        decision: ApprovalDecision,
        prompted: bool,
        automatic: bool,
        ts: Timestamp,
    },
    Completed {
        message_id: &'a str,
        usage: Option<&'a TokenUsage>,
        ts: Timestamp,
    },
    StreamError {
        message: &'a str,
        ts: Timestamp,
    },
}

/// A run that could not finish normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub message: String,
    pub session_id: Option<String>,
    pub cancelled: bool,
}

pub trait Projector: Send {
    /// Called once the handshake succeeded, before any event.
    fn begin(&mut self, handshake: &SessionHandshake) -> io::Result<()>;

    fn observe(&mut self, observation: &Observation<'_>, state: &RunState) -> io::Result<()>;

    /// Called once after the stream ended without failure.
    fn finish(&mut self, state: &RunState, elapsed: Duration) -> io::Result<()>;

    /// Called at most once, instead of [`Projector::finish`].
    fn fail(&mut self, failure: &RunFailure) -> io::Result<()>;
}

/// Builds the projector for `mode` over the given sinks.
pub fn build_projector(
    mode: OutputMode,
    options: RenderOptions,
    stdout: Sink,
    stderr: Sink,
) -> Box<dyn Projector> {
    match mode {
        OutputMode::Interactive => Box::new(InteractiveProjector::new(stdout, stderr, options)),
        OutputMode::Transcript { verbose } => Box::new(TranscriptProjector::new(stdout, verbose)),
        OutputMode::Feed => Box::new(FeedProjector::new(stdout)),
    }
}
