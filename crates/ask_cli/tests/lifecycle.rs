use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;

use ask_cli::lifecycle::{
    BackendLauncher, BackendLifecycle, Endpoint, LifecycleError, ProcessLauncher, RunningBackend,
};
use ask_protocol::CancelSignal;

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    stops: AtomicUsize,
}

struct FakeLauncher {
    counters: Arc<Counters>,
}

struct FakeBackend {
    counters: Arc<Counters>,
}

#[async_trait]
impl RunningBackend for FakeBackend {
    fn url(&self) -> &str {
        "http://127.0.0.1:4100"
    }

    async fn stop(&mut self) -> io::Result<()> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BackendLauncher for FakeLauncher {
    async fn launch(
        &self,
        _cancel: Option<&CancelSignal>,
    ) -> Result<Box<dyn RunningBackend>, LifecycleError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBackend {
            counters: Arc::clone(&self.counters),
        }))
    }
}

fn fake_lifecycle(external: Option<&str>) -> (BackendLifecycle, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let launcher = FakeLauncher {
        counters: Arc::clone(&counters),
    };
    (
        BackendLifecycle::new(external.map(ToString::to_string), Box::new(launcher)),
        counters,
    )
}

#[tokio::test]
async fn external_url_never_launches() {
    let (lifecycle, counters) = fake_lifecycle(Some("http://10.0.0.5:4000"));
    let endpoint = lifecycle.endpoint(None).await.expect("endpoint");
    assert_eq!(endpoint, Endpoint::External("http://10.0.0.5:4000".to_string()));
    lifecycle.shutdown().await;
    assert_eq!(counters.launches.load(Ordering::SeqCst), 0);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_external_url_falls_back_to_a_disposable_backend() {
    let (lifecycle, counters) = fake_lifecycle(Some("   "));
    let endpoint = lifecycle.endpoint(None).await.expect("endpoint");
    assert_eq!(endpoint.url(), "http://127.0.0.1:4100");
    assert_matches!(endpoint, Endpoint::Disposable(_));
    assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disposable_backend_is_started_once_and_stopped_once() {
    let (lifecycle, counters) = fake_lifecycle(None);
    let first = lifecycle.endpoint(None).await.expect("first");
    let second = lifecycle.endpoint(None).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(lifecycle.launches(), 1);

    lifecycle.shutdown().await;
    lifecycle.shutdown().await;
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_backend_binary_is_a_spawn_error() {
    let launcher = ProcessLauncher::new("ask-test-no-such-binary", Duration::from_secs(1));
    let error = launcher.launch(None).await.err().expect("spawn fails");
    assert_matches!(
        error,
        LifecycleError::Spawn { ref program, .. } if program == "ask-test-no-such-binary"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn backend_that_exits_before_listening_is_reported() {
    let launcher = ProcessLauncher::new("true", Duration::from_secs(10));
    let error = launcher.launch(None).await.err().expect("early exit");
    assert_matches!(error, LifecycleError::EarlyExit { .. });
}

#[cfg(unix)]
#[tokio::test]
async fn raised_cancel_aborts_startup() {
    let launcher = ProcessLauncher::new("true", Duration::from_secs(10));
    let cancel = Arc::new(AtomicBool::new(true));
    let error = launcher.launch(Some(&cancel)).await.err().expect("cancelled");
    assert_matches!(error, LifecycleError::Cancelled);
}

#[cfg(unix)]
#[tokio::test]
async fn backend_that_never_listens_times_out() {
    // `yes` ignores its arguments and runs until killed.
    let launcher = ProcessLauncher::new("yes", Duration::from_millis(300));
    let error = launcher.launch(None).await.err().expect("timeout");
    assert_matches!(error, LifecycleError::Timeout { timeout_ms: 300 });
    assert_eq!(
        error.to_string(),
        "backend did not accept connections within 300ms"
    );
}
