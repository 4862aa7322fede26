//! Process-level terminal and signal plumbing.

pub mod signals;
pub mod tty;
