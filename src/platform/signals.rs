//! SIGINT/SIGTERM delivery as a shared cancellation flag.

use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[cfg(unix)]
use std::sync::atomic::Ordering;
#[cfg(unix)]
use std::thread::{self, JoinHandle};

#[cfg(unix)]
use signal_hook::iterator::Signals;

/// Unregisters the handlers and joins the listener thread on drop.
#[cfg(unix)]
pub struct InterruptGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Raises `flag` on every SIGINT/SIGTERM until the guard is dropped.
///
/// Consumers poll the flag; nothing runs inside the signal context.
#[cfg(unix)]
pub fn install_interrupt_flag(flag: Arc<AtomicBool>) -> io::Result<InterruptGuard> {
    let mut signals = Signals::new([libc::SIGINT, libc::SIGTERM])?;
    let handle = signals.handle();
    let thread = thread::Builder::new()
        .name("ask-interrupt".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                flag.store(true, Ordering::Release);
            }
        })?;

    Ok(InterruptGuard {
        handle,
        thread: Some(thread),
    })
}

#[cfg(not(unix))]
pub struct InterruptGuard;

#[cfg(not(unix))]
pub fn install_interrupt_flag(_flag: Arc<AtomicBool>) -> io::Result<InterruptGuard> {
    Ok(InterruptGuard)
}
