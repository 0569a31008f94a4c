//! Shared type definitions for the milestone verification harness.
//!
//! This crate holds the data that flows between the core evaluator and the
//! runner binary: the per-room status table, milestone definitions with
//! their sticky outcomes, the snapshot events consumed from the simulation
//! feed, and the final run report.
//!
//! # Modules
//!
//! - [`status`] -- Per-room aggregated status and the fields milestones check
//! - [`milestone`] -- Milestone definitions and their tri-state outcome
//! - [`event`] -- Snapshot events delivered by the simulation feed
//! - [`report`] -- Final run report, end reason, and verdict

pub mod event;
pub mod milestone;
pub mod report;
pub mod status;

// Re-export all public types at crate root for convenience.
pub use event::TickEvent;
pub use milestone::{FailedRooms, Milestone, Outcome};
pub use report::{EndReason, RunReport, Verdict};
pub use status::{RoomName, RoomStatus, StatusField, StatusTable};
