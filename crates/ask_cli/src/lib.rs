//! `ask`: send one prompt to an agent backend and stream the reply.
//!
//! A run performs one handshake, consumes the session's ordered event
//! stream, gates tool approvals, and projects the result in exactly one of
//! three output modes: live terminal rendering, a JSON transcript, or a
//! JSON-lines event feed.
//!
//! Environment:
//!
//! - `ASK_SERVER_URL`: reuse this backend instead of starting one.
//! - `ASK_SERVER_BIN`: backend executable for the disposable instance
//!   (default `agi`, started as `<bin> serve --port <port>`).
//! - `ASK_SERVER_START_TIMEOUT_MS`: readiness timeout (default 15000).
//! - `ASK_HTTP_TIMEOUT_SEC`: timeout for non-streaming requests.
//! - `ASK_LOG`: `tracing` filter for diagnostics on stderr (default `warn`).

pub mod app;
pub mod approval;
pub mod cli;
pub mod config;
pub mod correlator;
pub mod lifecycle;
pub mod logging;
pub mod projector;
pub mod prompt;
pub mod run;
pub mod tool_policy;
pub mod transcript;

pub use approval::{ApprovalGate, GateOutcome};
pub use correlator::{Correlator, Flow, RunState};
pub use lifecycle::{BackendLifecycle, Endpoint, LifecycleError};
pub use projector::{OutputMode, Projector};
pub use run::{run_session, AskError};
pub use transcript::Transcript;
