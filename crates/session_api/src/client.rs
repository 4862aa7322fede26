use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use ask_protocol::{
    ApprovalReporter, AskRequest, CancelSignal, ClientError, EventSource, SessionBackend,
    SessionHandshake,
};

use crate::cancel::{await_or_cancel, is_cancelled};
use crate::config::SessionApiConfig;
use crate::error::{parse_error_message, SessionApiError};
use crate::headers::{build_headers, APPLICATION_JSON, EVENT_STREAM};
use crate::reporter::HttpApprovalReporter;
use crate::retry::{is_retryable_http_error, retry_delay};
use crate::stream::EventStream;
use crate::url::{approval_url, ask_url, normalize_base_url, stream_url};

/// HTTP client for one backend endpoint. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: Client,
    config: Arc<SessionApiConfig>,
    base: Url,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalBody<'a> {
    call_id: &'a str,
    approved: bool,
}

impl SessionClient {
    pub fn new(config: SessionApiConfig) -> Result<Self, SessionApiError> {
        let base = normalize_base_url(&config.base_url)?;
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            base,
        })
    }

    pub fn config(&self) -> &SessionApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn with_request_timeout(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Builds the handshake request without sending it.
    pub fn build_ask_request(&self, request: &AskRequest) -> Result<RequestBuilder, SessionApiError> {
        let url = ask_url(&self.base, self.config.project.as_deref())?;
        Ok(self.with_request_timeout(
            self.http
                .post(url)
                .headers(build_headers(&self.config, APPLICATION_JSON))
                .json(request),
        ))
    }

    /// Starts or resumes a session.
    ///
    /// Sent exactly once: a failed handshake may already have started billable
    /// work on the server, so it is never retried here.
    pub async fn start_session(
        &self,
        request: &AskRequest,
        cancel: Option<&CancelSignal>,
    ) -> Result<SessionHandshake, SessionApiError> {
        let response = await_or_cancel(self.build_ask_request(request)?.send(), cancel).await??;
        let status = response.status();
        let body = await_or_cancel(response.text(), cancel).await??;
        if !status.is_success() {
            return Err(SessionApiError::Status {
                status,
                message: parse_error_message(status, &body),
            });
        }

        let value: Value = serde_json::from_str(&body).map_err(SessionApiError::Body)?;
        let handshake = SessionHandshake::from_response(&value)?;
        debug!(
            session_id = %handshake.session_id,
            origin = ?handshake.origin,
            "handshake decoded"
        );
        Ok(handshake)
    }

    /// Opens the event stream for `session_id`.
    ///
    /// Connecting is retried with exponential backoff on transport failures
    /// and retryable statuses; subscribing to a stream has no side effects.
    pub async fn open_stream(
        &self,
        session_id: &str,
        cancel: Option<&CancelSignal>,
    ) -> Result<EventStream, SessionApiError> {
        let url = stream_url(&self.base, session_id, self.config.project.as_deref())?;
        let max_retries = self.config.stream_connect_retries;
        let mut last_error = String::new();

        for attempt in 0..=max_retries {
            if is_cancelled(cancel) {
                return Err(SessionApiError::Cancelled);
            }

            let send = self
                .http
                .get(url.clone())
                .headers(build_headers(&self.config, EVENT_STREAM))
                .send();

            match await_or_cancel(send, cancel).await? {
                Ok(response) if response.status().is_success() => {
                    debug!(%session_id, attempt, "event stream connected");
                    return Ok(EventStream::from_response(response));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = await_or_cancel(response.text(), cancel)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    if attempt < max_retries && is_retryable_http_error(status.as_u16(), &body) {
                        warn!(%status, attempt, %message, "stream connect rejected; retrying");
                        await_or_cancel(tokio::time::sleep(retry_delay(attempt)), cancel).await?;
                        continue;
                    }
                    return Err(SessionApiError::Status { status, message });
                }
                Err(error) => {
                    last_error = error.to_string();
                    if attempt < max_retries {
                        warn!(attempt, error = %last_error, "stream connect failed; retrying");
                        await_or_cancel(tokio::time::sleep(retry_delay(attempt)), cancel).await?;
                        continue;
                    }
                }
            }
        }

        Err(SessionApiError::RetryExhausted {
            attempts: max_retries + 1,
            last_error,
        })
    }

    /// Reports one approval decision.
    pub async fn resolve_approval(
        &self,
        session_id: &str,
        call_id: &str,
        approved: bool,
    ) -> Result<(), SessionApiError> {
        let url = approval_url(&self.base, session_id)?;
        let response = self
            .with_request_timeout(
                self.http
                    .post(url)
                    .headers(build_headers(&self.config, APPLICATION_JSON))
                    .json(&ApprovalBody { call_id, approved }),
            )
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SessionApiError::Status {
            status,
            message: parse_error_message(status, &body),
        })
    }
}

#[async_trait]
impl SessionBackend for SessionClient {
    async fn start_session(
        &self,
        request: &AskRequest,
        cancel: Option<&CancelSignal>,
    ) -> Result<SessionHandshake, ClientError> {
        SessionClient::start_session(self, request, cancel)
            .await
            .map_err(SessionApiError::into_handshake_error)
    }

    async fn open_stream(
        &self,
        session_id: &str,
        cancel: Option<&CancelSignal>,
    ) -> Result<Box<dyn EventSource>, ClientError> {
        SessionClient::open_stream(self, session_id, cancel)
            .await
            .map(|stream| Box::new(stream) as Box<dyn EventSource>)
            .map_err(SessionApiError::into_transport_error)
    }

    fn approval_reporter(&self, session_id: &str) -> Arc<dyn ApprovalReporter> {
        Arc::new(HttpApprovalReporter::new(self.clone(), session_id))
    }
}

