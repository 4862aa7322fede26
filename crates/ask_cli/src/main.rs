use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use ask_cli::app::{exit_code, needs_report, run};
use ask_cli::cli::Cli;
use ask_cli::config::EnvConfig;
use ask_cli::logging::init_tracing;
use ask_cli::run::EXIT_FAILURE;
use ask_protocol::CancelSignal;
use ask_term::install_interrupt_flag;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let env = EnvConfig::from_env();

    let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
    let _interrupts = match install_interrupt_flag(Arc::clone(&cancel)) {
        Ok(guard) => Some(guard),
        Err(err) => {
            warn!(error = %err, "interrupt handling unavailable");
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let result = runtime.block_on(run(&cli, &env, &cancel));
    if let Err(err) = &result {
        if needs_report(err) {
            eprintln!("error: {err:#}");
        }
    }
    ExitCode::from(exit_code(&result))
}
