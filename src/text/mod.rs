//! ANSI-aware text measurement and truncation.

pub mod ansi;
pub mod truncate;
pub mod width;

pub use ansi::strip_ansi;
pub use truncate::{first_line, truncate_to_width};
pub use width::visible_width;
