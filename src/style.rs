//! SGR styling helpers.
//!
//! [`Palette`] wraps text in escape sequences only when it was created for a
//! color-capable stream, so renderers can style unconditionally and still emit
//! plain text into pipes and log files.

fn ansi_wrap(text: &str, prefix: &str, suffix: &str) -> String {
    format!("{prefix}{text}{suffix}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

macro_rules! style_fn {
    ($name:ident, $on:literal, $off:literal) => {
        pub fn $name(&self, text: &str) -> String {
            if self.enabled {
                ansi_wrap(text, $on, $off)
            } else {
                text.to_string()
            }
        }
    };
}

impl Palette {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Palette that never emits escape sequences.
    #[must_use]
    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Enables color when `is_tty` holds and `NO_COLOR` is unset.
    #[must_use]
    pub fn detect(is_tty: bool) -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        Self::new(is_tty && !no_color)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    style_fn!(bold, "\x1b[1m", "\x1b[22m");
    style_fn!(dim, "\x1b[2m", "\x1b[22m");
    style_fn!(italic, "\x1b[3m", "\x1b[23m");
    style_fn!(red, "\x1b[31m", "\x1b[39m");
    style_fn!(green, "\x1b[32m", "\x1b[39m");
    style_fn!(yellow, "\x1b[33m", "\x1b[39m");
    style_fn!(blue, "\x1b[34m", "\x1b[39m");
    style_fn!(magenta, "\x1b[35m", "\x1b[39m");
    style_fn!(cyan, "\x1b[36m", "\x1b[39m");
}
