//! Simulation server provisioning over the admin CLI endpoint.
//!
//! The server exposes a text command endpoint at `{cli_url}/cli`: the body
//! of a `POST` is evaluated as one admin command and the response body is
//! its printed result. Every setup step is one such command. Commands are
//! assembled in [`commands`] with arguments encoded as JSON string literals,
//! so room and player names can never break out of the command syntax.

use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::RunnerError;

/// Builders for the admin commands used during setup.
pub mod commands {
    use serde_json::json;

    /// Wipe all world and user data.
    pub fn reset_all_data() -> String {
        "system.resetAllData()".to_owned()
    }

    /// Set the server tick duration in milliseconds.
    pub fn set_tick_duration(ms: u64) -> String {
        format!("system.setTickDuration({ms})")
    }

    /// Stop the simulation from advancing ticks.
    pub fn pause_simulation() -> String {
        "system.pauseSimulation()".to_owned()
    }

    /// Let the simulation advance ticks again.
    pub fn resume_simulation() -> String {
        "system.resumeSimulation()".to_owned()
    }

    /// Remove a player and everything it owns.
    pub fn remove_user(username: &str) -> String {
        format!("bots.removeUser({})", quote(username))
    }

    /// Rename the shard.
    pub fn set_shard_name(name: &str) -> String {
        format!("system.setShardName({})", quote(name))
    }

    /// Spawn `bot` into `room` as player `username`.
    pub fn spawn_bot(bot: &str, room: &str, username: &str) -> String {
        let options = json!({ "username": username, "auto": true });
        format!("bots.spawn({}, {}, {options})", quote(bot), quote(room))
    }

    /// Encode `value` as a quoted, escaped string literal.
    fn quote(value: &str) -> String {
        serde_json::Value::String(value.to_owned()).to_string()
    }
}

/// Ordered setup commands for a run.
///
/// Reset, pause, tick duration, stale player removal, optional shard
/// rename, then one spawn per tracked room. The simulation stays paused
/// until the runner has subscribed to the feed.
pub fn setup_commands(server: &ServerConfig, rooms: &[String]) -> Vec<String> {
    let mut plan = vec![
        commands::reset_all_data(),
        commands::pause_simulation(),
        commands::set_tick_duration(server.tick_duration_ms),
    ];
    plan.extend(
        rooms
            .iter()
            .map(|room| commands::remove_user(&server.player_for(room))),
    );
    if let Some(shard) = &server.shard_name {
        plan.push(commands::set_shard_name(shard));
    }
    plan.extend(
        rooms
            .iter()
            .map(|room| commands::spawn_bot(&server.bot_name, room, &server.player_for(room))),
    );
    plan
}

/// HTTP client for the server admin CLI.
pub struct ServerAdmin {
    client: reqwest::Client,
    cli_url: String,
}

impl ServerAdmin {
    /// Create a client for the admin endpoint under `cli_url`.
    pub fn new(cli_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            cli_url: cli_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Run one admin command and return its printed result.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Provision`] if the request fails or the server
    /// answers with a non-success status.
    pub async fn execute(&self, command: &str) -> Result<String, RunnerError> {
        let url = format!("{}/cli", self.cli_url);
        debug!(command = command, "sending admin command");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain")
            .body(command.to_owned())
            .send()
            .await
            .map_err(|e| RunnerError::Provision(format!("`{command}` request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read response body".to_owned());
        if !status.is_success() {
            return Err(RunnerError::Provision(format!(
                "`{command}` returned {status}: {body}"
            )));
        }
        debug!(command = command, result = body, "admin command done");
        Ok(body)
    }

    /// Run the setup commands for a run in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`RunnerError::Provision`] encountered.
    pub async fn provision(&self, server: &ServerConfig, rooms: &[String]) -> Result<(), RunnerError> {
        let plan = setup_commands(server, rooms);
        info!(steps = plan.len(), rooms = ?rooms, "provisioning simulation server");
        for command in &plan {
            self.execute(command).await?;
        }
        info!("simulation server provisioned");
        Ok(())
    }

    /// Resume the simulation once the feed is being consumed.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Provision`] if the command fails.
    pub async fn resume(&self) -> Result<(), RunnerError> {
        self.execute(&commands::resume_simulation()).await?;
        info!("simulation resumed");
        Ok(())
    }
}

impl std::fmt::Debug for ServerAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerAdmin")
            .field("cli_url", &self.cli_url)
            .finish_non_exhaustive()
    }
}
