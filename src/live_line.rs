//! In-place rewriting of the most recently printed line.

use std::io::{self, Write};

/// Moves up one row, clears it, and returns the carriage.
pub const REWRITE_PREVIOUS_LINE: &str = "\x1b[1A\x1b[2K\r";

/// Tracks whether the last line written to a stream is a pending "live" line
/// that may be replaced once its outcome is known.
///
/// The slot is keyed so only the owner of the pending line can rewrite it.
/// Any other write must call [`LiveLine::invalidate`] first, since it moves
/// the cursor away from the pending line.
#[derive(Debug, Default)]
pub struct LiveLine {
    rewrite_enabled: bool,
    pending: Option<String>,
}

impl LiveLine {
    /// `rewrite_enabled` should be false whenever the stream is not a terminal;
    /// lines are then strictly append-only.
    #[must_use]
    pub fn new(rewrite_enabled: bool) -> Self {
        Self {
            rewrite_enabled,
            pending: None,
        }
    }

    pub fn rewrite_enabled(&self) -> bool {
        self.rewrite_enabled
    }

    pub fn pending_key(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Writes `line` plus a newline and remembers it as the pending line for `key`.
    pub fn write_pending<W: Write>(&mut self, out: &mut W, key: &str, line: &str) -> io::Result<()> {
        writeln!(out, "{line}")?;
        self.pending = Some(key.to_string());
        Ok(())
    }

    /// Writes the final form of the line for `key`.
    ///
    /// Replaces the pending line in place when it is still the last line on
    /// screen; otherwise appends. Returns whether a rewrite happened.
    pub fn write_final<W: Write>(&mut self, out: &mut W, key: &str, line: &str) -> io::Result<bool> {
        let rewrite = self.rewrite_enabled && self.pending.as_deref() == Some(key);
        self.pending = None;
        if rewrite {
            write!(out, "{REWRITE_PREVIOUS_LINE}")?;
        }
        writeln!(out, "{line}")?;
        Ok(rewrite)
    }

    pub fn invalidate(&mut self) {
        self.pending = None;
    }
}
