//! Milestone runner entry point.
//!
//! Provisions a simulation server, streams its per-tick snapshots over NATS,
//! and checks a list of progress milestones against their deadline ticks.
//! The run ends when the observed tick reaches the budget given as the only
//! positional argument, or when the process receives an interrupt.
//!
//! # Architecture
//!
//! ```text
//! admin CLI (setup) --> NATS (snapshots) --> status table --> milestones --> report
//! ```
//!
//! Exit status is 0 when every required milestone was reached on time, 1
//! when one failed or the run errored, and 130 after an interrupt.

mod cli;
mod config;
mod controller;
mod error;
mod nats;
mod report;
mod server;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use milestone_core::cancel::CancelToken;
use milestone_types::Verdict;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::controller::RunController;
use crate::error::RunnerError;

/// Exit status after an interrupt (128 + SIGINT).
const EXIT_CANCELLED: u8 = 130;

/// Application entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("milestone-runner starting");

    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(error = format!("{e:#}"), "run failed");
            ExitCode::FAILURE
        }
    }
}

/// Load configuration, run one verification, and map the verdict to an exit code.
async fn run() -> anyhow::Result<ExitCode> {
    let config = RunnerConfig::from_env().context("failed to load configuration")?;
    info!(
        nats_url = config.nats_url,
        feed_subject = config.feed_subject,
        cli_url = config.server.cli_url,
        rooms = ?config.tracked_rooms,
        report_url = config.report.url.as_deref().unwrap_or("none"),
        "configuration loaded"
    );

    let budget = cli::budget_from_args(std::env::args());
    let milestones = milestone_core::config::load_milestones(&config.milestones_file);

    let cancel = Arc::new(CancelToken::new());
    tokio::spawn(watch_signals(Arc::clone(&cancel)));

    let controller = RunController::new(config, cancel);
    let report = controller.run(milestones, budget).await?;

    match report.verdict {
        None => {
            warn!(last_tick = report.last_tick, "run cancelled, no verdict");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Some(Verdict::Passed) => {
            info!(last_tick = report.last_tick, "all required milestones passed");
            Ok(ExitCode::SUCCESS)
        }
        Some(Verdict::Failed { milestones }) => {
            let failure = RunnerError::MilestonesFailed { milestones };
            error!(error = %failure, last_tick = report.last_tick, "run failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Cancel the run on the first interrupt or terminate signal.
async fn watch_signals(cancel: Arc<CancelToken>) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for interrupt");
                return;
            }
            info!("interrupt received, cancelling run");
        }
        () = terminate => info!("terminate signal received, cancelling run"),
    }
    cancel.cancel();
}
