use std::io::{self, Write};
use std::time::Duration;

use serde::Serialize;

use ask_protocol::SessionHandshake;

use crate::correlator::RunState;
use crate::projector::{Observation, Projector, RunFailure, Sink};
use crate::transcript::Transcript;

/// Writes nothing while the run is live, then one pretty-printed transcript.
pub struct TranscriptProjector {
    out: Sink,
    verbose: bool,
    session_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEntry<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

impl TranscriptProjector {
    pub fn new(out: Sink, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            session_id: None,
        }
    }
}

impl Projector for TranscriptProjector {
    fn begin(&mut self, handshake: &SessionHandshake) -> io::Result<()> {
        self.session_id = Some(handshake.session_id.clone());
        Ok(())
    }

    fn observe(&mut self, _observation: &Observation<'_>, _state: &RunState) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, state: &RunState, _elapsed: Duration) -> io::Result<()> {
        let json = Transcript::build(state, self.verbose)
            .to_json_pretty()
            .map_err(io::Error::other)?;
        writeln!(self.out, "{json}")?;
        self.out.flush()
    }

    fn fail(&mut self, failure: &RunFailure) -> io::Result<()> {
        let entry = ErrorEntry {
            error: &failure.message,
            session_id: failure.session_id.as_deref().or(self.session_id.as_deref()),
        };
        let json = serde_json::to_string_pretty(&entry).map_err(io::Error::other)?;
        writeln!(self.out, "{json}")?;
        self.out.flush()
    }
}
