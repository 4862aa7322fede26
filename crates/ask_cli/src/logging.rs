//! Diagnostics go to stderr through `tracing`; stdout is reserved for
//! assistant text and the JSON output modes.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `ASK_LOG=debug`.
pub const LOG_ENV: &str = "ASK_LOG";

pub fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    // A subscriber may already be installed by an embedding test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
