//! Human-oriented live rendering.
//!
//! Assistant text streams to stdout untouched so it can be piped. Everything
//! else (context, reasoning, tool activity, plans, the summary) goes to
//! stderr. A tool call is printed as a pending line and rewritten in place
//! with its outcome when nothing else was printed in between.

use std::io::{self, Write};
use std::time::Duration;

use serde_json::Value;

use ask_protocol::{PlanItem, PlanStatus, SessionHandshake, SessionOrigin, TokenUsage, ToolResultRecord};
use ask_term::{first_line, truncate_to_width, LiveLine, Palette};

use crate::correlator::RunState;
use crate::projector::{Observation, Projector, RunFailure, Sink};
use crate::tool_policy::{call_preview, is_hidden, is_read_only};

const DETAIL_LINES: usize = 7;
const TOOL_OUTPUT_WIDTH: usize = 160;
const SUMMARY_FILES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub verbose: bool,
    pub read_verbose: bool,
    /// Always print the run summary.
    pub summary: bool,
    /// Style stderr output.
    pub color: bool,
    /// Rewrite pending tool lines in place; requires stderr to be a terminal.
    pub rewrite: bool,
    /// Values the user passed explicitly; shown in the context line ahead of
    /// what the server resolved.
    pub agent: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

pub struct InteractiveProjector {
    out: Sink,
    err: Sink,
    palette: Palette,
    live: LiveLine,
    options: RenderOptions,
    /// Stdout holds assistant text not yet terminated by a newline.
    text_mid_line: bool,
    /// Assistant text was printed since the last tool line.
    text_since_tool: bool,
    reasoning_open: bool,
}

impl InteractiveProjector {
    pub fn new(out: Sink, err: Sink, options: RenderOptions) -> Self {
        Self {
            out,
            err,
            palette: Palette::new(options.color),
            live: LiveLine::new(options.rewrite),
            options,
            text_mid_line: false,
            text_since_tool: false,
            reasoning_open: false,
        }
    }

    /// Ends any open stdout line and reasoning block before stderr output.
    fn settle(&mut self) -> io::Result<()> {
        if self.reasoning_open {
            self.reasoning_open = false;
            writeln!(self.err)?;
            self.live.invalidate();
        }
        if self.text_mid_line {
            self.text_mid_line = false;
            writeln!(self.out)?;
            self.out.flush()?;
            self.live.invalidate();
        }
        Ok(())
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.live.invalidate();
        writeln!(self.err, "{text}")
    }

    fn tool_name(&self, name: &str) -> String {
        let palette = &self.palette;
        match name {
            "write" | "edit" | "apply_patch" | "git_commit" => palette.green(name),
            "bash" | "terminal" => palette.yellow(name),
            "websearch" => palette.magenta(name),
            "glob" => palette.cyan(name),
            _ if is_read_only(name) => palette.blue(name),
            _ => palette.cyan(name),
        }
    }

    fn render_begin(&mut self, handshake: &SessionHandshake) -> io::Result<()> {
        let agent = self.options.agent.as_deref().unwrap_or(&handshake.agent);
        let provider = self.options.provider.as_deref().unwrap_or(&handshake.provider);
        let model = self.options.model.as_deref().unwrap_or(&handshake.model);
        let context = format!("Context • agent={agent} • provider={provider} • model={model}");
        let context = self.palette.dim(&context);
        self.line(&context)?;

        if let Some(origin) = handshake.origin {
            let label = match origin {
                SessionOrigin::Created => "Created new session",
                SessionOrigin::Resumed => "Using last session",
            };
            let label = format!("{} {}", self.palette.dim(label), handshake.session_id);
            self.line(&label)?;
        }
        writeln!(self.err)?;
        self.err.flush()
    }

    fn render_text(&mut self, delta: &str) -> io::Result<()> {
        if self.reasoning_open {
            self.reasoning_open = false;
            writeln!(self.err)?;
        }
        self.live.invalidate();
        write!(self.out, "{delta}")?;
        self.out.flush()?;
        self.text_mid_line = !delta.ends_with('\n');
        self.text_since_tool = true;
        Ok(())
    }

    fn render_reasoning(&mut self, delta: &str) -> io::Result<()> {
        if self.text_mid_line {
            self.text_mid_line = false;
            writeln!(self.out)?;
            self.out.flush()?;
        }
        self.live.invalidate();
        if !self.reasoning_open {
            self.reasoning_open = true;
            let label = self.palette.italic(&self.palette.dim("thinking "));
            write!(self.err, "{label}")?;
        }
        let delta = self.palette.dim(delta);
        write!(self.err, "{delta}")?;
        self.err.flush()
    }

    fn call_line(&self, name: &str, args: Option<&Value>) -> String {
        let mut line = format!("{} {}", self.palette.bold("›"), self.tool_name(name));
        if let Some(preview) = args.and_then(|args| call_preview(name, args)) {
            line.push_str(&format!(" {} {preview}", self.palette.dim("›")));
        }
        line
    }

    fn render_call(&mut self, name: &str, call_id: Option<&str>, args: &Value) -> io::Result<()> {
        self.settle()?;
        if is_hidden(name) {
            return Ok(());
        }
        if self.text_since_tool {
            self.text_since_tool = false;
            self.line("")?;
        }
        let line = self.call_line(name, Some(args));
        match call_id {
            Some(call_id) => self.live.write_pending(&mut self.err, call_id, &line)?,
            None => self.line(&line)?,
        }
        if self.options.verbose && !args.is_null() {
            let pretty = serde_json::to_string_pretty(args).map_err(io::Error::other)?;
            for arg_line in pretty.lines() {
                let arg_line = self.palette.dim(&format!("    {arg_line}"));
                self.line(&arg_line)?;
            }
        }
        self.err.flush()
    }

    fn render_tool_output(&mut self, name: &str, channel: &str, delta: &str) -> io::Result<()> {
        let verbose = self.options.verbose;
        if channel == "input" && !verbose {
            return Ok(());
        }
        if is_read_only(name) && !verbose && !self.options.read_verbose {
            return Ok(());
        }
        let text = delta.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return Ok(());
        }
        self.settle()?;
        let line = format!(
            "{} {name} {} {}",
            self.palette.dim(&format!("[{channel}]")),
            self.palette.dim("›"),
            truncate_to_width(&text, TOOL_OUTPUT_WIDTH, "…")
        );
        self.line(&line)?;
        self.err.flush()
    }

    fn render_result(&mut self, record: &ToolResultRecord, args: Option<&Value>) -> io::Result<()> {
        if is_hidden(&record.name) {
            return Ok(());
        }
        self.settle()?;
        let duration = record
            .duration_ms
            .map(|ms| self.palette.dim(&format!(" ({ms}ms)")))
            .unwrap_or_default();
        let key = record.call_id.as_deref().unwrap_or_default();

        if record.is_error {
            let header = self.palette.red(&format!("✗ {} error", record.name));
            self.live.write_final(&mut self.err, key, &format!("{header}{duration}"))?;
            let message = record.error.as_deref().unwrap_or_default();
            let message = self.palette.red(&format!("    {message}"));
            self.line(&message)?;
            self.render_failed_patch(record)?;
            return self.err.flush();
        }

        let header = format!(
            "{} {} done{duration}",
            self.call_line(&record.name, args),
            self.palette.dim("›")
        );
        self.live.write_final(&mut self.err, key, &header)?;
        self.render_details(record)?;
        self.err.flush()
    }

    fn render_details(&mut self, record: &ToolResultRecord) -> io::Result<()> {
        let result = &record.result;
        if let Some(patch) = record
            .artifact
            .as_ref()
            .filter(|artifact| artifact.is_file_diff())
            .and_then(|artifact| artifact.patch.as_deref())
        {
            return self.render_diff(patch);
        }
        match record.name.as_str() {
            "bash" | "terminal" => {
                if let Some(stdout) = result.get("stdout").and_then(Value::as_str) {
                    self.render_excerpt(stdout, false)?;
                }
                if let Some(stderr) = result.get("stderr").and_then(Value::as_str) {
                    self.render_excerpt(stderr, true)?;
                }
                Ok(())
            }
            "tree" => match result.get("tree").and_then(Value::as_str) {
                Some(tree) => self.render_excerpt(tree, false),
                None => Ok(()),
            },
            name if self.options.verbose || (self.options.read_verbose && is_read_only(name)) => {
                self.render_verbose_result(name, result)
            }
            _ => Ok(()),
        }
    }

    fn render_verbose_result(&mut self, name: &str, result: &Value) -> io::Result<()> {
        if let Some(matches) = result.get("matches").and_then(Value::as_array) {
            let noun = if matches.len() == 1 { "match" } else { "matches" };
            let summary = self.palette.dim(&format!("    {} {noun}", matches.len()));
            return self.line(&summary);
        }
        if let Some(files) = result.get("files").and_then(Value::as_array) {
            let listing = files.iter().map(display_line).collect::<Vec<_>>().join("\n");
            return self.render_excerpt(&listing, false);
        }
        if let Some(raw) = result.get("raw").and_then(Value::as_array) {
            let listing = raw.iter().map(display_line).collect::<Vec<_>>().join("\n");
            return self.render_excerpt(&listing, false);
        }
        if let Some(patch) = result.get("patch").and_then(Value::as_str) {
            return self.render_diff(patch);
        }
        if name == "read" {
            return Ok(());
        }
        for key in ["output", "content", "text"] {
            if let Some(text) = result.get(key).and_then(Value::as_str) {
                return self.render_excerpt(text, false);
            }
        }
        Ok(())
    }

    fn render_failed_patch(&mut self, record: &ToolResultRecord) -> io::Result<()> {
        let Some(patch) = record
            .artifact
            .as_ref()
            .filter(|artifact| artifact.is_file_diff())
            .and_then(|artifact| artifact.patch.as_deref())
        else {
            return Ok(());
        };
        let label = self.palette.dim("    Patch that failed:");
        self.line(&label)?;
        self.render_excerpt(patch, false)
    }

    fn render_excerpt(&mut self, text: &str, error: bool) -> io::Result<()> {
        let lines: Vec<&str> = text.trim_end().lines().collect();
        for line in lines.iter().take(DETAIL_LINES) {
            let line = format!("    {line}");
            let line = if error {
                self.palette.red(&line)
            } else {
                self.palette.dim(&line)
            };
            self.line(&line)?;
        }
        self.render_more(lines.len())
    }

    fn render_diff(&mut self, patch: &str) -> io::Result<()> {
        let lines: Vec<&str> = patch.trim_end().lines().collect();
        for line in lines.iter().take(DETAIL_LINES) {
            let styled = if line.starts_with("+++") || line.starts_with("---") {
                self.palette.bold(line)
            } else if line.starts_with('+') {
                self.palette.green(line)
            } else if line.starts_with('-') {
                self.palette.red(line)
            } else if line.starts_with("@@") {
                self.palette.cyan(line)
            } else {
                self.palette.dim(line)
            };
            self.line(&format!("    {styled}"))?;
        }
        self.render_more(lines.len())
    }

    fn render_more(&mut self, total: usize) -> io::Result<()> {
        if total <= DETAIL_LINES {
            return Ok(());
        }
        let more = self
            .palette
            .dim(&format!("    … and {} more lines", total - DETAIL_LINES));
        self.line(&more)
    }

    fn render_plan(&mut self, items: &[PlanItem], note: Option<&str>) -> io::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.settle()?;
        self.line("")?;
        let header = self.palette.bold("Plan:");
        self.line(&header)?;
        if let Some(note) = note {
            let note = self.palette.dim(&format!("   {note}"));
            self.line(&note)?;
        }
        for item in items {
            let icon = match item.status {
                PlanStatus::Completed => self.palette.green("✓"),
                PlanStatus::InProgress => self.palette.yellow("⋯"),
                PlanStatus::Pending => self.palette.dim("○"),
            };
            self.line(&format!("   {icon} {}", item.step))?;
        }
        self.line("")?;
        self.err.flush()
    }

    fn render_summary(&mut self, state: &RunState) -> io::Result<()> {
        self.line("")?;
        let header = self.palette.bold("Summary:");
        self.line(&header)?;

        if !state.tool_calls.is_empty() {
            let label = self.palette.dim("   Tools:");
            self.line(&label)?;
            let mut counts: Vec<(&str, usize)> = Vec::new();
            for call in &state.tool_calls {
                match counts.iter_mut().find(|(name, _)| *name == call.name) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((&call.name, 1)),
                }
            }
            for (name, count) in counts {
                self.line(&format!("     • {name} × {count}"))?;
            }
        }

        if !state.files_touched.is_empty() {
            let label = self.palette.dim("   Files:");
            self.line(&label)?;
            for file in state.files_touched.iter().take(SUMMARY_FILES) {
                self.line(&format!("     • {file}"))?;
            }
            if state.files_touched.len() > SUMMARY_FILES {
                let more = format!("     … and {} more", state.files_touched.len() - SUMMARY_FILES);
                let more = self.palette.dim(&more);
                self.line(&more)?;
            }
        }

        if let Some(usage) = &state.usage {
            self.render_usage(usage)?;
        }
        Ok(())
    }

    fn render_usage(&mut self, usage: &TokenUsage) -> io::Result<()> {
        let counts = [
            ("Input", usage.input_tokens),
            ("Output", usage.output_tokens),
            ("Total", usage.total_tokens),
        ];
        if counts.iter().all(|(_, count)| count.is_none()) && usage.cost_usd.is_none() {
            return Ok(());
        }
        let label = self.palette.dim("   Tokens:");
        self.line(&label)?;
        for (label, count) in counts {
            if let Some(count) = count {
                self.line(&format!("     • {label}: {}", group_thousands(count)))?;
            }
        }
        if let Some(cost) = usage.cost_usd {
            self.line(&format!("     • Cost: ${cost:.4}"))?;
        }
        Ok(())
    }
}

fn display_line(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => first_line(&other.to_string(), TOOL_OUTPUT_WIDTH),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

impl Projector for InteractiveProjector {
    fn begin(&mut self, handshake: &SessionHandshake) -> io::Result<()> {
        self.render_begin(handshake)
    }

    fn observe(&mut self, observation: &Observation<'_>, _state: &RunState) -> io::Result<()> {
        match *observation {
            Observation::AssistantText { delta, .. } => self.render_text(delta),
            Observation::Reasoning { delta, .. } => self.render_reasoning(delta),
            Observation::ToolCall(call) => {
                self.render_call(&call.name, call.call_id.as_deref(), &call.args)
            }
            Observation::ToolOutput {
                name,
                channel,
                delta,
                ..
            } => self.render_tool_output(name, channel, delta),
            Observation::ToolResult { record, args } => self.render_result(record, args),
            Observation::Plan { items, note, .. } => self.render_plan(items, note),
            Observation::ApprovalPending { .. } => {
                self.settle()?;
                self.live.invalidate();
                self.err.flush()
            }
            Observation::ApprovalResolved {
                request,
                automatic,
                prompted,
                ..
            } => {
                if automatic && !prompted && self.options.verbose {
                    let line = self
                        .palette
                        .dim(&format!("  auto-approved {}", request.tool_name));
                    self.line(&line)?;
                }
                Ok(())
            }
            Observation::Completed { .. } => Ok(()),
            Observation::StreamError { message, .. } => {
                self.settle()?;
                let line = self.palette.red(&format!("[error] {message}"));
                self.line(&line)?;
                self.err.flush()
            }
        }
    }

    fn finish(&mut self, state: &RunState, elapsed: Duration) -> io::Result<()> {
        self.settle()?;
        if self.options.summary || state.finish_seen || !state.tool_calls.is_empty() {
            self.render_summary(state)?;
        }
        self.line("")?;
        let done = self
            .palette
            .dim(&format!("Done in {}ms", elapsed.as_millis()));
        self.line(&done)?;
        self.out.flush()?;
        self.err.flush()
    }

    fn fail(&mut self, failure: &RunFailure) -> io::Result<()> {
        self.settle()?;
        let line = if failure.cancelled {
            self.palette.yellow("[interrupted]")
        } else {
            self.palette.red(&format!("[error] {}", failure.message))
        };
        self.line(&line)?;
        self.out.flush()?;
        self.err.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::group_thousands;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(7), "7");
        assert_eq!(group_thousands(1234), "1,234");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
