use std::io;
use std::path::PathBuf;

use clap::Parser;

use ask_protocol::AskRequest;

use crate::projector::{OutputMode, RenderOptions};

/// Send one prompt to an agent backend and stream the reply.
#[derive(Debug, Clone, Parser)]
#[command(name = "ask", version)]
pub struct Cli {
    /// Prompt text; several words are joined with spaces.
    #[arg(required = true, num_args = 1.., value_name = "PROMPT")]
    pub prompt: Vec<String>,

    #[arg(long)]
    pub agent: Option<String>,

    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Continue the session with this id.
    #[arg(long = "session", value_name = "ID")]
    pub session_id: Option<String>,

    /// Continue the most recently used session.
    #[arg(long, conflicts_with = "session_id")]
    pub last: bool,

    /// Project root sent to the backend. Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Print one JSON transcript after the run.
    #[arg(long, conflicts_with = "json_stream")]
    pub json: bool,

    /// Print one JSON object per event as the run progresses.
    #[arg(long = "json-stream")]
    pub json_stream: bool,

    /// Like --json, with raw chunks, lines, segments, and tool records.
    #[arg(long = "json-verbose", conflicts_with = "json_stream")]
    pub json_verbose: bool,

    /// Show tool arguments, input deltas, and detailed results.
    #[arg(long)]
    pub verbose: bool,

    /// Show output of read-only tools.
    #[arg(long = "read-verbose")]
    pub read_verbose: bool,

    /// Always print the run summary.
    #[arg(long)]
    pub summary: bool,

    /// Approve every tool call without asking.
    #[arg(short = 'y', long = "yes", alias = "auto-approve")]
    pub yes: bool,
}

impl Cli {
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.json_stream {
            OutputMode::Feed
        } else if self.json || self.json_verbose {
            OutputMode::Transcript {
                verbose: self.json_verbose,
            }
        } else {
            OutputMode::Interactive
        }
    }

    pub fn ask_request(&self) -> AskRequest {
        AskRequest {
            prompt: self.prompt_text(),
            agent: self.agent.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            session_id: self.session_id.clone(),
            last: self.last,
            json_mode: self.output_mode().is_json(),
            auto_approve: self.yes,
        }
    }

    pub fn render_options(&self, color: bool, rewrite: bool) -> RenderOptions {
        RenderOptions {
            verbose: self.verbose,
            read_verbose: self.read_verbose,
            summary: self.summary,
            color,
            rewrite,
            agent: self.agent.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
        }
    }

    pub fn project_root(&self) -> io::Result<String> {
        let root = match &self.project {
            Some(project) => project.clone(),
            None => std::env::current_dir()?,
        };
        Ok(root.to_string_lossy().into_owned())
    }
}
