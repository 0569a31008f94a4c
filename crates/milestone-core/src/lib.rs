//! Status aggregation, milestone evaluation, and the tick-budget run loop.
//!
//! This crate owns everything in a verification run that has state: the
//! per-room status table, the tick gate, the sticky milestone outcomes, and
//! the loop that waits for the tick budget.
//!
//! # Modules
//!
//! - [`aggregate`] -- Folds snapshot events into the per-room status table.
//! - [`cancel`] -- [`CancelToken`] shared between the signal handler and
//!   the run loop.
//! - [`clock`] -- Tick gate holding the simulation clock.
//! - [`config`] -- Milestone definitions loaded from YAML.
//! - [`evaluate`] -- Per-tick milestone evaluation.
//! - [`runner`] -- [`RunState`] and the [`await_ticks`] wait loop.
//! - [`verdict`] -- Pass/fail verdict over required milestones.
//!
//! [`CancelToken`]: cancel::CancelToken
//! [`RunState`]: runner::RunState
//! [`await_ticks`]: runner::await_ticks

pub mod aggregate;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod evaluate;
pub mod runner;
pub mod verdict;
