use std::time::Duration;

use crate::retry::MAX_RETRIES;

/// Default `User-Agent` for backend requests.
pub const DEFAULT_USER_AGENT: &str = concat!("ask/", env!("CARGO_PKG_VERSION"));

/// Transport configuration for one backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionApiConfig {
    /// Backend root, e.g. `http://127.0.0.1:9100`.
    pub base_url: String,
    /// Project root forwarded as the `project` query parameter.
    pub project: Option<String>,
    /// Timeout for non-streaming requests. The event stream itself is
    /// unbounded and only ends on close, error, or cancellation.
    pub request_timeout: Option<Duration>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Retries allowed when opening the event stream.
    pub stream_connect_retries: u32,
}

impl SessionApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project: None,
            request_timeout: None,
            user_agent: None,
            stream_connect_retries: MAX_RETRIES,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_stream_connect_retries(mut self, retries: u32) -> Self {
        self.stream_connect_retries = retries;
        self
    }
}
