//! Wiring from parsed flags and environment to one run.

use std::io;

use anyhow::{bail, Context};

use ask_protocol::CancelSignal;
use ask_term::{is_terminal, Palette, STDERR_FD};
use session_api::{SessionApiConfig, SessionClient};

use crate::cli::Cli;
use crate::config::EnvConfig;
use crate::lifecycle::{BackendLifecycle, ProcessLauncher};
use crate::projector::{build_projector, Projector};
use crate::prompt::TerminalPrompt;
use crate::run::{report_failure, run_session, AskError, EXIT_FAILURE, EXIT_OK};

/// Runs the prompt described by `cli`.
///
/// A disposable backend started for this run is always shut down, after the
/// event stream has been closed.
pub async fn run(cli: &Cli, env: &EnvConfig, cancel: &CancelSignal) -> anyhow::Result<()> {
    if cli.prompt_text().trim().is_empty() {
        bail!("prompt must not be empty");
    }
    let project = cli
        .project_root()
        .context("failed to resolve the project directory")?;

    let stderr_tty = is_terminal(STDERR_FD);
    let options = cli.render_options(Palette::detect(stderr_tty).enabled(), stderr_tty);
    let projector = build_projector(
        cli.output_mode(),
        options,
        Box::new(io::stdout()),
        Box::new(io::stderr()),
    );

    let lifecycle = BackendLifecycle::new(
        env.server_url.clone(),
        Box::new(ProcessLauncher::new(&env.server_bin, env.start_timeout)),
    );
    let result = drive(cli, env, &lifecycle, projector, project, cancel).await;
    lifecycle.shutdown().await;
    result.map_err(anyhow::Error::from)
}

async fn drive(
    cli: &Cli,
    env: &EnvConfig,
    lifecycle: &BackendLifecycle,
    mut projector: Box<dyn Projector>,
    project: String,
    cancel: &CancelSignal,
) -> Result<(), AskError> {
    let endpoint = match lifecycle.endpoint(Some(cancel)).await {
        Ok(endpoint) => endpoint,
        Err(error) => {
            let error = AskError::from(error);
            report_failure(projector.as_mut(), &error, None);
            return Err(error);
        }
    };

    let mut config = SessionApiConfig::new(endpoint.url()).with_project(project);
    if let Some(timeout) = env.http_timeout {
        config = config.with_request_timeout(timeout);
    }
    let client = match SessionClient::new(config) {
        Ok(client) => client,
        Err(error) => {
            let error = AskError::from(error);
            report_failure(projector.as_mut(), &error, None);
            return Err(error);
        }
    };

    let prompt = TerminalPrompt::new(cancel.clone());
    run_session(
        &client,
        &cli.ask_request(),
        projector,
        Box::new(prompt),
        Some(cancel),
    )
    .await
    .map(|_| ())
}

/// Process exit status for the outcome of [`run`].
pub fn exit_code(result: &anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => EXIT_OK,
        Err(error) => error
            .downcast_ref::<AskError>()
            .map_or(EXIT_FAILURE, AskError::exit_code),
    }
}

/// Whether `error` still has to be printed; run failures were already
/// reported in the active output mode.
pub fn needs_report(error: &anyhow::Error) -> bool {
    error.downcast_ref::<AskError>().is_none()
}
