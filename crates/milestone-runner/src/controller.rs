//! Run controller: the pipeline from an empty server to a delivered report.
//!
//! A run walks through these phases:
//! 1. Setup: provision the server through the admin CLI (fatal on error)
//! 2. Streaming: subscribe to the snapshot feed, then resume the simulation
//! 3. Awaiting ticks: feed snapshots into the run state until the tick
//!    budget is met or the run is cancelled
//! 4. Finalizing: build the report, log the summary, deliver it
//!
//! The feed subscription is opened before the simulation resumes so the
//! first ticks are never missed. Every setup and streaming step races the
//! cancel token; a cancellation at any phase skips straight to finalizing,
//! and the report is delivered without a verdict.

use std::future::Future;
use std::sync::Arc;

use milestone_core::cancel::CancelToken;
use milestone_core::runner::{self, RunState, TickBudget};
use milestone_types::{EndReason, Milestone, RunReport};
use tracing::info;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::nats::NatsClient;
use crate::report::ReportSink;
use crate::server::ServerAdmin;

/// Drives one verification run.
pub struct RunController {
    config: RunnerConfig,
    admin: ServerAdmin,
    sink: ReportSink,
    cancel: Arc<CancelToken>,
}

impl RunController {
    /// Create a controller for `config`, sharing `cancel` with the signal handler.
    pub fn new(config: RunnerConfig, cancel: Arc<CancelToken>) -> Self {
        let admin = ServerAdmin::new(&config.server.cli_url);
        let sink = ReportSink::from_config(&config.report);
        Self {
            config,
            admin,
            sink,
            cancel,
        }
    }

    /// Run the full pipeline and return the delivered report.
    ///
    /// A cancelled run still returns `Ok` with a report that has no verdict.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if provisioning, the NATS feed, or report
    /// rendering fails.
    pub async fn run(
        &self,
        milestones: Vec<Milestone>,
        budget: TickBudget,
    ) -> Result<RunReport, RunnerError> {
        let mut state = RunState::new(self.config.tracked_rooms.iter().cloned(), milestones);
        info!(
            run_id = %state.run_id(),
            rooms = ?self.config.tracked_rooms,
            milestones = state.milestones().len(),
            max_ticks = budget.max_ticks(),
            "run started"
        );

        let end_reason = self.drive(&mut state, budget).await?;

        let report = state.finalize(end_reason);
        runner::log_run_end(&report);
        self.sink.deliver(&report).await?;
        Ok(report)
    }

    /// Setup, streaming, and the tick wait. Returns why the wait ended.
    async fn drive(&self, state: &mut RunState, budget: TickBudget) -> Result<EndReason, RunnerError> {
        let provision = self
            .admin
            .provision(&self.config.server, &self.config.tracked_rooms);
        let Some(()) = self.unless_cancelled(provision).await? else {
            return Ok(cancelled_during("setup", state));
        };

        let Some(nats) = self
            .unless_cancelled(NatsClient::connect(&self.config.nats_url))
            .await?
        else {
            return Ok(cancelled_during("connect", state));
        };
        let Some(mut feed) = self
            .unless_cancelled(nats.subscribe_feed(&self.config.feed_subject))
            .await?
        else {
            return Ok(cancelled_during("subscribe", state));
        };
        let Some(()) = self.unless_cancelled(self.admin.resume()).await? else {
            return Ok(cancelled_during("resume", state));
        };

        Ok(runner::await_ticks(
            state,
            &mut feed,
            budget,
            &self.cancel,
            self.config.poll_interval,
        )
        .await)
    }

    /// Run `step` unless the token fires first. `None` means cancelled.
    async fn unless_cancelled<T, F>(&self, step: F) -> Result<Option<T>, RunnerError>
    where
        F: Future<Output = Result<T, RunnerError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Ok(None),
            result = step => result.map(Some),
        }
    }
}

/// Log a cancellation that ended the run before or instead of the tick wait.
fn cancelled_during(phase: &str, state: &RunState) -> EndReason {
    info!(phase = phase, last_tick = state.last_tick(), "run cancelled");
    EndReason::Cancelled
}

impl std::fmt::Debug for RunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunController")
            .field("admin", &self.admin)
            .field("sink", &self.sink)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;
    use crate::config::{ReportConfig, ServerConfig};

    fn config(cli_url: &str) -> RunnerConfig {
        RunnerConfig {
            nats_url: "nats://localhost:4222".to_owned(),
            feed_subject: "sim.events".to_owned(),
            server: ServerConfig {
                cli_url: cli_url.to_owned(),
                tick_duration_ms: 100,
                shard_name: None,
                bot_name: "bot".to_owned(),
                player_prefix: "player".to_owned(),
            },
            tracked_rooms: vec!["W1N1".to_owned()],
            milestones_file: PathBuf::from("milestones.yaml"),
            poll_interval: Duration::from_millis(50),
            report: ReportConfig {
                url: None,
                api_key: None,
            },
        }
    }

    #[tokio::test]
    async fn provisioning_failure_aborts_the_run() {
        let controller = RunController::new(config("http://127.0.0.1:9"), Arc::new(CancelToken::new()));
        let result = controller
            .run(milestone_core::config::default_milestones(), TickBudget::Ticks(10))
            .await;
        assert!(matches!(result, Err(RunnerError::Provision(_))));
    }

    #[tokio::test]
    async fn cancel_while_provisioning_ends_the_run() {
        // Accepts connections and never answers, so provisioning hangs.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let cancel = Arc::new(CancelToken::new());
        let controller = RunController::new(config(&format!("http://{addr}")), Arc::clone(&cancel));
        let canceller = {
            let cancel = Arc::clone(&cancel);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                cancel.cancel();
            })
        };

        let report = tokio::time::timeout(
            Duration::from_secs(3),
            controller.run(milestone_core::config::default_milestones(), TickBudget::Ticks(10)),
        )
        .await
        .unwrap()
        .unwrap();
        canceller.await.unwrap();
        server.abort();

        assert_eq!(report.end_reason, EndReason::Cancelled);
        assert_eq!(report.verdict, None);
        assert_eq!(report.last_tick, 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_skips_setup() {
        let cancel = Arc::new(CancelToken::new());
        cancel.cancel();
        let controller = RunController::new(config("http://127.0.0.1:9"), cancel);
        let report = controller
            .run(milestone_core::config::default_milestones(), TickBudget::Immediate)
            .await
            .unwrap();
        assert_eq!(report.end_reason, EndReason::Cancelled);
        assert_eq!(report.verdict, None);
    }

    // Requires a simulation server with the admin CLI and a NATS server.
    #[tokio::test]
    #[ignore]
    async fn short_run_against_live_server() {
        let controller = RunController::new(
            config("http://localhost:21026"),
            Arc::new(CancelToken::new()),
        );
        let report = controller
            .run(milestone_core::config::default_milestones(), TickBudget::Ticks(5))
            .await;
        assert!(report.is_ok());
    }
}
