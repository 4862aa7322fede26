use tokio::runtime::Handle;
use tracing::{debug, warn};

use ask_protocol::ApprovalReporter;

use crate::client::SessionClient;

/// Posts approval decisions on a detached task.
///
/// The caller never waits for the request; a failure is logged and dropped
/// because the server applies its own timeout to unanswered approvals.
#[derive(Debug, Clone)]
pub struct HttpApprovalReporter {
    client: SessionClient,
    session_id: String,
    runtime: Option<Handle>,
}

impl HttpApprovalReporter {
    /// Captures the current tokio runtime, if any, for spawning reports.
    pub fn new(client: SessionClient, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
            runtime: Handle::try_current().ok(),
        }
    }
}

impl ApprovalReporter for HttpApprovalReporter {
    fn report(&self, call_id: &str, approved: bool) {
        let Some(runtime) = self.runtime.as_ref() else {
            warn!(%call_id, approved, "no async runtime; approval decision not reported");
            return;
        };

        let client = self.client.clone();
        let session_id = self.session_id.clone();
        let call_id = call_id.to_string();
        runtime.spawn(async move {
            match client.resolve_approval(&session_id, &call_id, approved).await {
                Ok(()) => debug!(%call_id, approved, "approval reported"),
                Err(error) => warn!(%call_id, approved, %error, "approval report failed"),
            }
        });
    }
}
