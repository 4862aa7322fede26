//! Approval prompt on the controlling terminal.

use std::io::{self, Write};

use ask_protocol::{ApprovalDecision, ApprovalRequest, CancelSignal, DecisionPrompt};
use ask_term::{
    is_terminal, read_key, read_line, Key, LineInput, Palette, RawModeGuard, STDERR_FD, STDIN_FD,
};

/// Asks on stderr and reads the answer from stdin.
///
/// With a terminal on stdin a single keypress decides; otherwise one line is
/// read and end of input denies. A raised cancel flag denies in both cases.
pub struct TerminalPrompt {
    palette: Palette,
    cancel: CancelSignal,
}

impl TerminalPrompt {
    pub fn new(cancel: CancelSignal) -> Self {
        Self {
            palette: Palette::detect(is_terminal(STDERR_FD)),
            cancel,
        }
    }

    fn read_key_decision(&self) -> io::Result<ApprovalDecision> {
        let _raw = RawModeGuard::enable(STDIN_FD)?;
        loop {
            if let Some(decision) = key_decision(read_key(STDIN_FD, Some(self.cancel.as_ref()))?) {
                return Ok(decision);
            }
        }
    }

    fn read_line_decision(&self) -> io::Result<ApprovalDecision> {
        read_line(STDIN_FD, Some(self.cancel.as_ref())).map(|input| input_decision(&input))
    }
}

/// Decision for one keypress; `None` for keys that are ignored.
pub fn key_decision(key: Key) -> Option<ApprovalDecision> {
    match key {
        Key::Char('y' | 'Y') | Key::Enter => Some(ApprovalDecision::ApproveOnce),
        Key::Char('n' | 'N') | Key::Escape | Key::Interrupt => Some(ApprovalDecision::Deny),
        Key::Char('a' | 'A') => Some(ApprovalDecision::Always),
        _ => None,
    }
}

/// Decision for one line of input; `None` at end of input.
pub fn line_decision(line: Option<&str>) -> ApprovalDecision {
    match line.map(|line| line.trim().to_ascii_lowercase()).as_deref() {
        Some("" | "y" | "yes") => ApprovalDecision::ApproveOnce,
        Some("a" | "always") => ApprovalDecision::Always,
        _ => ApprovalDecision::Deny,
    }
}

pub fn input_decision(input: &LineInput) -> ApprovalDecision {
    match input {
        LineInput::Line(line) => line_decision(Some(line)),
        LineInput::Eof => line_decision(None),
        LineInput::Interrupted => ApprovalDecision::Deny,
    }
}

impl DecisionPrompt for TerminalPrompt {
    fn decide(
        &mut self,
        request: &ApprovalRequest,
        preview: Option<&str>,
    ) -> io::Result<ApprovalDecision> {
        let palette = self.palette;
        let mut err = io::stderr().lock();
        writeln!(err)?;
        writeln!(
            err,
            "{} {} {} {}",
            palette.yellow("⚠"),
            palette.bold("Approval required"),
            palette.dim("→"),
            palette.bold(&request.tool_name)
        )?;
        if let Some(preview) = preview {
            writeln!(err, "  {}", palette.dim(preview))?;
        }
        write!(
            err,
            "  {}es  {}o  {}lways ",
            palette.green("[y]"),
            palette.red("[n]"),
            palette.cyan("[a]")
        )?;
        err.flush()?;

        let decision = if is_terminal(STDIN_FD) {
            self.read_key_decision()
        } else {
            self.read_line_decision()
        };
        let decision = match decision {
            Ok(decision) => decision,
            Err(error) => {
                writeln!(err)?;
                return Err(error);
            }
        };

        let echo = match decision {
            ApprovalDecision::ApproveOnce => palette.green("✓ approved"),
            ApprovalDecision::Always => palette.green("✓ approved (auto-approve enabled)"),
            ApprovalDecision::Deny => palette.red("✗ denied"),
        };
        writeln!(err, "{echo}")?;
        writeln!(err)?;
        err.flush()?;
        Ok(decision)
    }
}
