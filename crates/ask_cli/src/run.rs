//! The run driver: handshake, stream consumption, and orderly teardown.

use std::io;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use ask_protocol::{
    AskRequest, CancelSignal, ClientError, DecisionPrompt, EventSource, SessionBackend,
};
use session_api::SessionApiError;

use crate::approval::ApprovalGate;
use crate::correlator::{now_ms, Correlator, Flow, RunState};
use crate::lifecycle::LifecycleError;
use crate::projector::{Projector, RunFailure};

/// Exit status for a successful run.
pub const EXIT_OK: u8 = 0;
/// Exit status for any failure.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status after an interrupt.
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Error)]
pub enum AskError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Transport(#[from] SessionApiError),
    #[error(transparent)]
    Session(#[from] ClientError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl AskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Lifecycle(LifecycleError::Cancelled)
                | Self::Transport(SessionApiError::Cancelled)
                | Self::Session(ClientError::Cancelled)
        )
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_cancelled() {
            EXIT_INTERRUPTED
        } else {
            EXIT_FAILURE
        }
    }
}

/// Tells the projector about `error`. Output failures are only logged, since
/// the projector's sink is what failed.
pub fn report_failure(projector: &mut dyn Projector, error: &AskError, session_id: Option<&str>) {
    let failure = RunFailure {
        message: error.to_string(),
        session_id: session_id.map(ToString::to_string),
        cancelled: error.is_cancelled(),
    };
    if let Err(err) = projector.fail(&failure) {
        warn!(error = %err, "failed to report run failure");
    }
}

/// Runs one prompt against `backend` and returns the final run state.
///
/// The handshake is attempted exactly once. The event stream is closed
/// before this returns, whatever the outcome. Failures are reported through
/// `projector` before they are returned.
pub async fn run_session(
    backend: &dyn SessionBackend,
    request: &AskRequest,
    mut projector: Box<dyn Projector>,
    prompt: Box<dyn DecisionPrompt>,
    cancel: Option<&CancelSignal>,
) -> Result<RunState, AskError> {
    let started = Instant::now();
    let started_at = now_ms();

    let handshake = match backend.start_session(request, cancel).await {
        Ok(handshake) => handshake,
        Err(error) => {
            let error = AskError::from(error);
            report_failure(projector.as_mut(), &error, None);
            return Err(error);
        }
    };
    info!(session_id = %handshake.session_id, message_id = %handshake.assistant_message_id, "session started");
    projector.begin(&handshake)?;

    let mut stream = match backend.open_stream(&handshake.session_id, cancel).await {
        Ok(stream) => stream,
        Err(error) => {
            let error = AskError::from(error);
            report_failure(projector.as_mut(), &error, Some(&handshake.session_id));
            return Err(error);
        }
    };

    let reporter = backend.approval_reporter(&handshake.session_id);
    let gate = ApprovalGate::new(request.auto_approve, prompt, reporter);
    let state = RunState::new(handshake, request.prompt.clone(), started_at);
    let mut correlator = Correlator::new(state, gate, projector);

    let consumed = consume(&mut correlator, stream.as_mut(), cancel).await;
    stream.close().await;

    match consumed {
        Ok(()) => {
            correlator.finish(started.elapsed())?;
            Ok(correlator.into_state())
        }
        Err(error) => {
            let session_id = correlator.state().session_id().to_string();
            report_failure(correlator.projector_mut(), &error, Some(&session_id));
            Err(error)
        }
    }
}

async fn consume(
    correlator: &mut Correlator,
    stream: &mut dyn EventSource,
    cancel: Option<&CancelSignal>,
) -> Result<(), AskError> {
    loop {
        match stream.next_event(cancel).await? {
            Some(event) => {
                if correlator.handle(event)? == Flow::Complete {
                    return Ok(());
                }
            }
            None => {
                warn!("event stream ended before the assistant message completed");
                return Ok(());
            }
        }
    }
}
