use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use ask_protocol::CancelSignal;

use crate::error::SessionApiError;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub fn is_cancelled(cancel: Option<&CancelSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Awaits `future`, giving up with [`SessionApiError::Cancelled`] as soon as
/// the signal is raised. The flag is polled, so cancellation is observed
/// within one poll interval even while the future is parked on I/O.
pub async fn await_or_cancel<F>(
    future: F,
    cancel: Option<&CancelSignal>,
) -> Result<F::Output, SessionApiError>
where
    F: Future,
{
    if cancel.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);
    loop {
        if is_cancelled(cancel) {
            return Err(SessionApiError::Cancelled);
        }
        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancel) {
                return Err(SessionApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::await_or_cancel;
    use crate::error::SessionApiError;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let cancel = Arc::new(AtomicBool::new(false));
        let value = await_or_cancel(async { 7 }, Some(&cancel)).await;
        assert_matches!(value, Ok(7));
    }

    #[tokio::test]
    async fn raised_flag_interrupts_a_pending_future() {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            flag.store(true, Ordering::Release);
        });

        let result = await_or_cancel(std::future::pending::<()>(), Some(&cancel)).await;
        assert_matches!(result, Err(SessionApiError::Cancelled));
    }
}
