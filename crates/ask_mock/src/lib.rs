//! Deterministic doubles for the `ask_protocol` seams.
//!
//! This crate contains no transport logic. It lets run-driver tests script a
//! handshake, an event sequence, and human approval answers, then inspect
//! what was reported back.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use ask_protocol::{
    ApprovalDecision, ApprovalReporter, ApprovalRequest, AskRequest, CancelSignal, ClientError,
    DecisionPrompt, EventSource, SessionBackend, SessionHandshake, SessionOrigin, StreamEvent,
};

pub mod build;

const HANG_POLL: Duration = Duration::from_millis(10);

/// One step of a scripted stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Event(StreamEvent),
    /// Fail the next read with this error.
    Fail(ClientError),
    /// Never produce anything; only cancellation ends the wait.
    Hang,
}

impl From<StreamEvent> for ScriptStep {
    fn from(event: StreamEvent) -> Self {
        Self::Event(event)
    }
}

/// Event source that replays a fixed script, then reports end of stream.
#[derive(Debug)]
pub struct ScriptedEventSource {
    steps: VecDeque<ScriptStep>,
    closed: Arc<AtomicBool>,
}

impl ScriptedEventSource {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        Self::new(events.into_iter().map(ScriptStep::Event))
    }

    /// Flag raised once [`EventSource::close`] has been called.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

#[async_trait]
impl EventSource for ScriptedEventSource {
    async fn next_event(
        &mut self,
        cancel: Option<&CancelSignal>,
    ) -> Result<Option<StreamEvent>, ClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        match self.steps.pop_front() {
            None => Ok(None),
            Some(ScriptStep::Event(event)) => Ok(Some(event)),
            Some(ScriptStep::Fail(error)) => Err(error),
            Some(ScriptStep::Hang) => loop {
                if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
                    return Err(ClientError::Cancelled);
                }
                tokio::time::sleep(HANG_POLL).await;
            },
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Reporter that records every decision in delivery order.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(String, bool)> {
        lock_unpoisoned(&self.reports).clone()
    }
}

impl ApprovalReporter for RecordingReporter {
    fn report(&self, call_id: &str, approved: bool) {
        lock_unpoisoned(&self.reports).push((call_id.to_string(), approved));
    }
}

/// One prompt shown by [`ScriptedPrompt`].
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRecord {
    pub call_id: String,
    pub tool_name: String,
    pub preview: Option<String>,
}

/// Prompt that answers from a queue and denies once the queue is empty.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    answers: Arc<Mutex<VecDeque<ApprovalDecision>>>,
    prompts: Arc<Mutex<Vec<PromptRecord>>>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = ApprovalDecision>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every prompt shown so far, in order.
    pub fn prompts(&self) -> Vec<PromptRecord> {
        lock_unpoisoned(&self.prompts).clone()
    }
}

impl DecisionPrompt for ScriptedPrompt {
    fn decide(
        &mut self,
        request: &ApprovalRequest,
        preview: Option<&str>,
    ) -> io::Result<ApprovalDecision> {
        lock_unpoisoned(&self.prompts).push(PromptRecord {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            preview: preview.map(ToString::to_string),
        });
        Ok(lock_unpoisoned(&self.answers)
            .pop_front()
            .unwrap_or(ApprovalDecision::Deny))
    }
}

/// Backend that returns a fixed handshake and one scripted stream.
#[derive(Debug)]
pub struct ScriptedBackend {
    handshake: Result<SessionHandshake, ClientError>,
    stream: Mutex<Option<ScriptedEventSource>>,
    reporter: RecordingReporter,
    requests: Mutex<Vec<AskRequest>>,
    stream_opens: AtomicUsize,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(handshake: SessionHandshake, stream: ScriptedEventSource) -> Self {
        Self {
            handshake: Ok(handshake),
            stream: Mutex::new(Some(stream)),
            reporter: RecordingReporter::default(),
            requests: Mutex::new(Vec::new()),
            stream_opens: AtomicUsize::new(0),
        }
    }

    /// Backend whose handshake always fails with `error`.
    #[must_use]
    pub fn failing(error: ClientError) -> Self {
        Self {
            handshake: Err(error),
            stream: Mutex::new(None),
            reporter: RecordingReporter::default(),
            requests: Mutex::new(Vec::new()),
            stream_opens: AtomicUsize::new(0),
        }
    }

    pub fn reporter(&self) -> RecordingReporter {
        self.reporter.clone()
    }

    /// Handshake requests received, in order.
    pub fn requests(&self) -> Vec<AskRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn stream_opens(&self) -> usize {
        self.stream_opens.load(Ordering::Acquire)
    }
}

#[async_trait]
impl SessionBackend for ScriptedBackend {
    async fn start_session(
        &self,
        request: &AskRequest,
        _cancel: Option<&CancelSignal>,
    ) -> Result<SessionHandshake, ClientError> {
        lock_unpoisoned(&self.requests).push(request.clone());
        self.handshake.clone()
    }

    async fn open_stream(
        &self,
        _session_id: &str,
        _cancel: Option<&CancelSignal>,
    ) -> Result<Box<dyn EventSource>, ClientError> {
        self.stream_opens.fetch_add(1, Ordering::AcqRel);
        lock_unpoisoned(&self.stream)
            .take()
            .map(|stream| Box::new(stream) as Box<dyn EventSource>)
            .ok_or_else(|| ClientError::transport("scripted stream already consumed"))
    }

    fn approval_reporter(&self, _session_id: &str) -> Arc<dyn ApprovalReporter> {
        Arc::new(self.reporter.clone())
    }
}

/// Handshake for the given identifiers with a mock agent, provider, and model.
#[must_use]
pub fn handshake(session_id: &str, message_id: &str) -> SessionHandshake {
    SessionHandshake {
        session_id: session_id.to_string(),
        assistant_message_id: message_id.to_string(),
        agent: "general".to_string(),
        provider: "mock".to_string(),
        model: "mock-model".to_string(),
        origin: Some(SessionOrigin::Created),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use ask_protocol::{
        ApprovalDecision, ApprovalReporter, ClientError, DecisionPrompt, EventSource,
        SessionBackend,
    };

    use super::{
        build, handshake, RecordingReporter, ScriptStep, ScriptedBackend, ScriptedEventSource,
        ScriptedPrompt,
    };

    #[tokio::test]
    async fn scripted_source_replays_then_ends() {
        let mut source = ScriptedEventSource::new([
            ScriptStep::Event(build::assistant_delta("m1", "hi")),
            ScriptStep::Fail(ClientError::transport("reset")),
        ]);

        assert!(source.next_event(None).await.expect("event").is_some());
        assert_eq!(
            source.next_event(None).await,
            Err(ClientError::transport("reset"))
        );
        assert_eq!(source.next_event(None).await, Ok(None));
    }

    #[tokio::test]
    async fn hang_step_ends_only_on_cancel() {
        let mut source = ScriptedEventSource::new([ScriptStep::Hang]);
        let cancel = Arc::new(AtomicBool::new(true));
        assert_eq!(
            source.next_event(Some(&cancel)).await,
            Err(ClientError::Cancelled)
        );
    }

    #[tokio::test]
    async fn close_is_observable_and_ends_the_stream() {
        let mut source = ScriptedEventSource::from_events([build::completed("m1")]);
        let closed = source.closed_flag();
        source.close().await;
        assert!(closed.load(Ordering::Acquire));
        assert_eq!(source.next_event(None).await, Ok(None));
    }

    #[test]
    fn prompt_answers_in_order_then_denies() {
        let mut prompt = ScriptedPrompt::new([ApprovalDecision::Always]);
        let request = build::approval_request("c1", "bash", serde_json::json!({"cmd": "ls"}));

        assert_eq!(
            prompt.decide(&request, Some("ls")).expect("decide"),
            ApprovalDecision::Always
        );
        assert_eq!(
            prompt.decide(&request, None).expect("decide"),
            ApprovalDecision::Deny
        );
        assert_eq!(prompt.prompts().len(), 2);
        assert_eq!(prompt.prompts()[0].preview.as_deref(), Some("ls"));
    }

    #[test]
    fn recording_reporter_keeps_delivery_order() {
        let reporter = RecordingReporter::default();
        reporter.report("a", true);
        reporter.report("b", false);
        assert_eq!(
            reporter.reports(),
            vec![("a".to_string(), true), ("b".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn backend_hands_out_its_stream_once() {
        let backend = ScriptedBackend::new(handshake("s1", "m1"), ScriptedEventSource::new([]));
        assert!(backend.open_stream("s1", None).await.is_ok());
        assert!(backend.open_stream("s1", None).await.is_err());
        assert_eq!(backend.stream_opens(), 2);
    }
}
