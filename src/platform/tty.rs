//! TTY detection, raw mode, and cancellable reads on stdin.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(unix)]
use libc::c_int;

pub const STDIN_FD: i32 = 0;
pub const STDOUT_FD: i32 = 1;
pub const STDERR_FD: i32 = 2;

const KEY_POLL_MS: i32 = 50;

/// One decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    /// Ctrl-C delivered as a byte while the terminal is in raw mode.
    Interrupt,
    /// Escape sequences (arrows, function keys) and anything undecodable.
    Other,
}

/// Outcome of one cancellable line read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    /// One line, including its trailing newline when one was read.
    Line(String),
    /// End of input before any byte of a new line.
    Eof,
    Interrupted,
}

#[cfg(unix)]
pub fn is_terminal(fd: i32) -> bool {
    unsafe { libc::isatty(fd as c_int) == 1 }
}

#[cfg(not(unix))]
pub fn is_terminal(_fd: i32) -> bool {
    false
}

/// Restores the original termios settings on drop.
#[cfg(unix)]
pub struct RawModeGuard {
    fd: c_int,
    original: libc::termios,
}

#[cfg(unix)]
impl RawModeGuard {
    pub fn enable(fd: i32) -> io::Result<Self> {
        let original = get_termios(fd)?;
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        // Keep output post-processing so "\n" still returns the carriage.
        raw.c_oflag |= libc::OPOST;
        set_termios(fd, &raw)?;
        Ok(Self { fd, original })
    }
}

#[cfg(unix)]
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = set_termios(self.fd, &self.original);
    }
}

#[cfg(not(unix))]
pub struct RawModeGuard;

#[cfg(not(unix))]
impl RawModeGuard {
    pub fn enable(_fd: i32) -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "raw mode requires a unix terminal",
        ))
    }
}

/// Blocks until one key is available on `fd` (expected to be in raw mode).
///
/// Returns `Key::Interrupt` early when `cancel` is raised by a signal handler.
#[cfg(unix)]
pub fn read_key(fd: i32, cancel: Option<&AtomicBool>) -> io::Result<Key> {
    loop {
        if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
            return Ok(Key::Interrupt);
        }
        if !poll_readable(fd, KEY_POLL_MS) {
            continue;
        }

        let mut buf = [0u8; 16];
        let read = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if read < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for a key",
            ));
        }
        return Ok(decode_key(&buf[..read as usize]));
    }
}

#[cfg(not(unix))]
pub fn read_key(_fd: i32, _cancel: Option<&AtomicBool>) -> io::Result<Key> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "key reads require a unix terminal",
    ))
}

/// Reads one line from `fd` without blocking past a raised `cancel` flag.
///
/// Bytes are consumed one at a time so input after the newline stays
/// unread for the next call.
#[cfg(unix)]
pub fn read_line(fd: i32, cancel: Option<&AtomicBool>) -> io::Result<LineInput> {
    let mut bytes = Vec::new();
    loop {
        if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
            return Ok(LineInput::Interrupted);
        }
        if !poll_readable(fd, KEY_POLL_MS) {
            continue;
        }

        let mut byte = 0u8;
        let read = unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) };
        if read < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if read == 0 {
            if bytes.is_empty() {
                return Ok(LineInput::Eof);
            }
            return Ok(LineInput::Line(String::from_utf8_lossy(&bytes).into_owned()));
        }
        bytes.push(byte);
        if byte == b'\n' {
            return Ok(LineInput::Line(String::from_utf8_lossy(&bytes).into_owned()));
        }
    }
}

/// Without `poll` the read blocks; `cancel` is only checked before it starts.
#[cfg(not(unix))]
pub fn read_line(_fd: i32, cancel: Option<&AtomicBool>) -> io::Result<LineInput> {
    use std::io::BufRead;

    if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
        return Ok(LineInput::Interrupted);
    }
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(LineInput::Eof);
    }
    Ok(LineInput::Line(line))
}

pub fn decode_key(bytes: &[u8]) -> Key {
    match bytes {
        [0x1b] => Key::Escape,
        [0x03] => Key::Interrupt,
        [b'\r'] | [b'\n'] | [b'\r', b'\n'] => Key::Enter,
        [0x1b, ..] => Key::Other,
        _ => std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| {
                let mut chars = text.chars();
                let first = chars.next()?;
                chars.next().is_none().then_some(first)
            })
            .map(Key::Char)
            .unwrap_or(Key::Other),
    }
}

#[cfg(unix)]
fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & (libc::POLLIN | libc::POLLHUP)) != 0
}

#[cfg(unix)]
fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
