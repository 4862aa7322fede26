#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ask_cli::correlator::RunState;
use ask_cli::projector::{Observation, Projector, RunFailure, Sink};
use ask_protocol::SessionHandshake;

/// In-memory sink shared between a projector and the test.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn sink(&self) -> Sink {
        Box::new(self.clone())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock_unpoisoned(&self.bytes)).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(ToString::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_unpoisoned(&self.bytes).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct ProjectorTrace {
    pub begun: Vec<String>,
    pub observations: Vec<String>,
    pub finished: usize,
    pub failures: Vec<RunFailure>,
}

/// Projector that records a short label per callback.
pub struct TraceProjector {
    trace: Arc<Mutex<ProjectorTrace>>,
}

impl TraceProjector {
    pub fn new() -> (Self, Arc<Mutex<ProjectorTrace>>) {
        let trace = Arc::new(Mutex::new(ProjectorTrace::default()));
        (
            Self {
                trace: Arc::clone(&trace),
            },
            trace,
        )
    }
}

fn label(observation: &Observation<'_>) -> String {
    match observation {
        Observation::AssistantText { delta, .. } => format!("text:{delta}"),
        Observation::Reasoning { delta, .. } => format!("reasoning:{delta}"),
        Observation::ToolCall(call) => format!("call:{}", call.name),
        Observation::ToolOutput { name, delta, .. } => format!("output:{name}:{delta}"),
        Observation::ToolResult { record, .. } => format!("result:{}", record.name),
        Observation::Plan { items, .. } => format!("plan:{}", items.len()),
        Observation::ApprovalPending { request, .. } => format!("approval:{}", request.call_id),
        Observation::ApprovalResolved {
            request, decision, ..
        } => format!("resolved:{}:{}", request.call_id, decision.approved()),
        Observation::Completed { message_id, .. } => format!("completed:{message_id}"),
        Observation::StreamError { message, .. } => format!("error:{message}"),
    }
}

impl Projector for TraceProjector {
    fn begin(&mut self, handshake: &SessionHandshake) -> io::Result<()> {
        lock_unpoisoned(&self.trace)
            .begun
            .push(handshake.session_id.clone());
        Ok(())
    }

    fn observe(&mut self, observation: &Observation<'_>, _state: &RunState) -> io::Result<()> {
        lock_unpoisoned(&self.trace)
            .observations
            .push(label(observation));
        Ok(())
    }

    fn finish(&mut self, _state: &RunState, _elapsed: Duration) -> io::Result<()> {
        lock_unpoisoned(&self.trace).finished += 1;
        Ok(())
    }

    fn fail(&mut self, failure: &RunFailure) -> io::Result<()> {
        lock_unpoisoned(&self.trace).failures.push(failure.clone());
        Ok(())
    }
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
