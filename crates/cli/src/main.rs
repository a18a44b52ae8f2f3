use std::process::ExitCode;

use clap::Parser as _;
use color_eyre::eyre;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};
use trcswap_core::{
    config::Config,
    telemetry::{self, init_subscriber},
};

use crate::cli::Cli;

mod cli;
mod tokens;
mod trade;
mod wallet;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to read config:\n{err:?}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_subscriber(telemetry::get_subscriber()) {
        eprintln!("failed to set up tracing: {e}");
    }

    let cli = Cli::parse();
    let shutdown_token = CancellationToken::new();
    let command_jh = tokio::spawn(cli.run(config, shutdown_token.clone()));

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            error!(%e, "failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let exit_reason = select! {
        res = command_jh => match res {
            Ok(command_result) => command_result.map(|()| "command completed"),
            Err(e) => Err(eyre::eyre!("command task panicked: {e}")),
        },
        _ = sigterm.recv() => Ok("received SIGTERM"),
        _ = sigint.recv() => Ok("received SIGINT"),
    };

    shutdown(exit_reason, shutdown_token)
}

#[instrument(skip_all)]
fn shutdown(reason: eyre::Result<&str>, shutdown_token: CancellationToken) -> ExitCode {
    shutdown_token.cancel();
    match reason {
        Ok(reason) => {
            info!(reason, "exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("{e:?}");
            ExitCode::FAILURE
        }
    }
}
