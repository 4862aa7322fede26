//! Terminal primitives for the `ask` streaming client.
//!
//! Everything here is stream-agnostic: renderers hand in a `Write` sink and
//! decide once, from [`is_terminal`], whether styling and in-place rewriting
//! are allowed. Nothing in this crate knows about sessions or events.

pub mod live_line;
pub mod platform;
pub mod style;
pub mod text;

pub use crate::live_line::LiveLine;
pub use crate::platform::signals::{install_interrupt_flag, InterruptGuard};
pub use crate::platform::tty::{
    decode_key, is_terminal, read_key, read_line, Key, LineInput, RawModeGuard, STDERR_FD,
    STDIN_FD, STDOUT_FD,
};
pub use crate::style::Palette;
pub use crate::text::{first_line, strip_ansi, truncate_to_width, visible_width};
