//! Transport-neutral contract between the session stream and its consumers.
//!
//! This crate defines the event vocabulary of one `ask` run, the handshake
//! types, the records a run accumulates, and the three seams the run driver
//! depends on:
//!
//! - [`SessionBackend`]: starts a session and opens its event stream.
//! - [`ApprovalReporter`]: fire-and-forget delivery of approval decisions.
//! - [`DecisionPrompt`]: blocking human decision for one approval request.
//!
//! It contains no HTTP, terminal, or rendering code.

use std::fmt;
use std::io;
use std::sync::{atomic::AtomicBool, Arc};

use async_trait::async_trait;

pub mod event;
pub mod handshake;
pub mod record;
pub mod value;

pub use event::{
    ApprovalRequest, PlanItem, PlanStatus, StreamEvent, TokenUsage, ToolArtifact,
    FILE_DIFF_ARTIFACT, UNNAMED_TOOL,
};
pub use handshake::{AskRequest, HandshakeDecodeError, SessionHandshake, SessionOrigin};
pub use record::{
    ApprovalDecision, AssistantChunk, StreamErrorRecord, Timestamp, ToolCallRecord,
    ToolResultRecord,
};

/// Shared cancellation flag, raised by interrupt handlers.
pub type CancelSignal = Arc<AtomicBool>;

/// Failure reported by a [`SessionBackend`] or [`EventSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The shared cancellation flag was raised while waiting.
    Cancelled,
    /// Starting or resuming the session failed; nothing was streamed.
    Handshake(String),
    /// The event stream could not be opened or broke mid-run.
    Transport(String),
}

impl ClientError {
    #[must_use]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake(message.into())
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("interrupted"),
            Self::Handshake(message) => write!(f, "failed to start session: {message}"),
            Self::Transport(message) => write!(f, "event stream failed: {message}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Ordered, pull-based source of stream events.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next event. `Ok(None)` means the server closed the stream.
    async fn next_event(
        &mut self,
        cancel: Option<&CancelSignal>,
    ) -> Result<Option<StreamEvent>, ClientError>;

    /// Releases the underlying connection. Safe to call more than once.
    async fn close(&mut self);
}

/// Best-effort delivery of approval decisions back to the server.
///
/// Implementations must not block the caller; failures are observed and
/// discarded.
pub trait ApprovalReporter: Send + Sync {
    fn report(&self, call_id: &str, approved: bool);
}

/// Blocking human decision for one approval request.
pub trait DecisionPrompt: Send {
    /// Renders `request` with its optional argument `preview` and waits for
    /// the answer.
    fn decide(
        &mut self,
        request: &ApprovalRequest,
        preview: Option<&str>,
    ) -> io::Result<ApprovalDecision>;
}

/// Backend operations one run needs.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Starts or resumes a session. Called exactly once per run and never retried.
    async fn start_session(
        &self,
        request: &AskRequest,
        cancel: Option<&CancelSignal>,
    ) -> Result<SessionHandshake, ClientError>;

    /// Opens the ordered event stream for `session_id`.
    async fn open_stream(
        &self,
        session_id: &str,
        cancel: Option<&CancelSignal>,
    ) -> Result<Box<dyn EventSource>, ClientError>;

    /// Reporter that resolves approvals for `session_id`.
    fn approval_reporter(&self, session_id: &str) -> Arc<dyn ApprovalReporter>;
}
