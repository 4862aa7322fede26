//! HTTP + server-sent-events transport for the `ask` backend.
//!
//! This crate owns request building, response parsing, stream framing, and
//! connect retries for three routes:
//!
//! - `POST /v1/ask` starts or resumes a session (never retried).
//! - `GET /v1/sessions/<id>/stream` yields the ordered event stream.
//! - `POST /v1/sessions/<id>/approval` resolves an approval request.
//!
//! [`SessionClient`] implements [`ask_protocol::SessionBackend`], so the run
//! driver never sees HTTP types.

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod reporter;
pub mod retry;
pub mod sse;
pub mod stream;
pub mod url;

pub use client::SessionClient;
pub use config::SessionApiConfig;
pub use error::SessionApiError;
pub use reporter::HttpApprovalReporter;
pub use sse::{SseFrame, SseStreamParser};
pub use stream::EventStream;
pub use url::normalize_base_url;
