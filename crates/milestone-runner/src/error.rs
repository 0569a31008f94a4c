//! Error types for the milestone runner.
//!
//! Uses `thiserror` for typed errors that surface through the run pipeline:
//! configuration, server provisioning, the NATS event feed, and report
//! rendering. A run whose required milestones failed is also an error at
//! this level, so `main` can map it to exit status 1.

/// Errors that can occur while running a verification.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// A setup call against the simulation server failed.
    #[error("provisioning error: {0}")]
    Provision(String),

    /// Failed to connect to or subscribe on the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// A feed payload could not be decoded.
    #[error("feed decode error: {0}")]
    Decode(String),

    /// The report could not be delivered to the collector.
    #[error("report delivery error: {0}")]
    Report(String),

    /// One or more required milestones missed their deadline.
    #[error("required milestones failed: {}", .milestones.join(", "))]
    MilestonesFailed {
        /// Descriptions of the failing milestones.
        milestones: Vec<String>,
    },

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
