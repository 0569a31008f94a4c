//! Configuration types for the milestone runner.
//!
//! All configuration is loaded from environment variables. The runner needs
//! to know how to reach the simulation server's admin CLI, which rooms to
//! spawn into and track, where the event feed is published, and where to
//! send the final report. Milestone definitions live in a separate YAML
//! file (see `milestone_core::config`).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Subject the simulation publishes tick snapshots on.
    pub feed_subject: String,
    /// Simulation server provisioning settings.
    pub server: ServerConfig,
    /// Rooms to spawn into and track.
    pub tracked_rooms: Vec<String>,
    /// Path to the milestone definition file.
    pub milestones_file: PathBuf,
    /// How often the wait loop wakes to re-check the tick budget.
    pub poll_interval: Duration,
    /// Report collector settings.
    pub report: ReportConfig,
}

/// Settings for provisioning the simulation server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Base URL of the server admin CLI endpoint.
    pub cli_url: String,
    /// Tick duration to configure on the server, in milliseconds.
    pub tick_duration_ms: u64,
    /// New shard name, if the shard should be renamed during setup.
    pub shard_name: Option<String>,
    /// Bot code to spawn into every tracked room.
    pub bot_name: String,
    /// Prefix for the player spawned into each room (`{prefix}-{room}`).
    pub player_prefix: String,
}

impl ServerConfig {
    /// Player name used for the bot spawned into `room`.
    pub fn player_for(&self, room: &str) -> String {
        format!("{}-{room}", self.player_prefix)
    }
}

/// Settings for delivering the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Collector URL. When absent the report is only printed.
    pub url: Option<String>,
    /// Bearer credential for the collector. Empty values count as absent.
    pub api_key: Option<String>,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `NATS_URL` -- NATS server connection string
    ///
    /// Optional variables:
    /// - `FEED_SUBJECT` -- snapshot subject (default `sim.events`)
    /// - `SERVER_CLI_URL` -- admin CLI base URL (default `http://localhost:21026`)
    /// - `TRACKED_ROOMS` -- comma-separated room names (default `W1N1`)
    /// - `BOT_NAME` -- bot to spawn (default `bot`)
    /// - `PLAYER_PREFIX` -- player name prefix (default `player`)
    /// - `TICK_DURATION_MS` -- server tick duration (default 250)
    /// - `SHARD_NAME` -- rename the shard during setup (default: keep)
    /// - `MILESTONES_FILE` -- milestone YAML path (default `milestones.yaml`)
    /// - `POLL_INTERVAL_MS` -- wait loop wake-up interval (default 1000)
    /// - `REPORT_URL` -- report collector URL (default: print only)
    /// - `REPORT_API_KEY` -- collector credential (default: none)
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunnerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let nats_url = non_empty(&lookup, "NATS_URL").ok_or_else(|| {
            RunnerError::Config("missing required env var NATS_URL".to_owned())
        })?;

        let tracked_rooms = parse_rooms(
            &non_empty(&lookup, "TRACKED_ROOMS").unwrap_or_else(|| "W1N1".to_owned()),
        )?;

        let server = ServerConfig {
            cli_url: non_empty(&lookup, "SERVER_CLI_URL")
                .unwrap_or_else(|| "http://localhost:21026".to_owned()),
            tick_duration_ms: parse_u64(&lookup, "TICK_DURATION_MS", 250)?,
            shard_name: non_empty(&lookup, "SHARD_NAME"),
            bot_name: non_empty(&lookup, "BOT_NAME").unwrap_or_else(|| "bot".to_owned()),
            player_prefix: non_empty(&lookup, "PLAYER_PREFIX")
                .unwrap_or_else(|| "player".to_owned()),
        };

        Ok(Self {
            nats_url,
            feed_subject: non_empty(&lookup, "FEED_SUBJECT")
                .unwrap_or_else(|| "sim.events".to_owned()),
            server,
            tracked_rooms,
            milestones_file: PathBuf::from(
                non_empty(&lookup, "MILESTONES_FILE")
                    .unwrap_or_else(|| "milestones.yaml".to_owned()),
            ),
            poll_interval: Duration::from_millis(parse_u64(&lookup, "POLL_INTERVAL_MS", 1000)?),
            report: ReportConfig {
                url: non_empty(&lookup, "REPORT_URL"),
                api_key: non_empty(&lookup, "REPORT_API_KEY"),
            },
        })
    }
}

/// Read a variable, treating a blank value as absent.
fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Read an unsigned integer variable with a default.
fn parse_u64<F>(lookup: &F, name: &str, default: u64) -> Result<u64, RunnerError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, name).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| RunnerError::Config(format!("invalid {name}: {e}")))
    })
}

/// Split a comma-separated room list.
fn parse_rooms(raw: &str) -> Result<Vec<String>, RunnerError> {
    let mut rooms: Vec<String> = Vec::new();
    for room in raw.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        if !rooms.iter().any(|known| known == room) {
            rooms.push(room.to_owned());
        }
    }
    if rooms.is_empty() {
        return Err(RunnerError::Config(
            "TRACKED_ROOMS must name at least one room".to_owned(),
        ));
    }
    Ok(rooms)
}
