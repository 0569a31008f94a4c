//! Run state and the tick-budget wait loop.
//!
//! This module provides [`RunState`], the single owner of everything a run
//! mutates (status table, tick gate, milestones), and [`await_ticks`], the
//! loop that feeds snapshots into it until:
//!
//! - **Budget met**: the observed tick reaches the configured budget
//! - **Cancelled**: the shared [`CancelToken`] fires
//! - **No budget**: returns immediately without reading the feed
//!
//! Events are handled one at a time inside the loop, so aggregation and
//! evaluation never run concurrently and need no locking. Between events the
//! loop sleeps on a timer and re-checks the budget; if the feed ends early
//! the loop keeps waiting for cancellation.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use milestone_types::{EndReason, Milestone, Outcome, RoomName, RunReport, TickEvent, Verdict};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::StatusAggregator;
use crate::cancel::CancelToken;
use crate::clock::{TickGate, TickStep};
use crate::evaluate::{self, MilestoneChange};
use crate::verdict;

/// Shortest allowed wake-up interval for the wait loop.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How many ticks the run waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickBudget {
    /// Do not wait for ticks at all.
    Immediate,
    /// Wait until the observed tick is at least this value.
    Ticks(u64),
}

impl TickBudget {
    /// Budget from a raw tick count; 0 means [`TickBudget::Immediate`].
    pub const fn from_ticks(max_ticks: u64) -> Self {
        if max_ticks == 0 {
            Self::Immediate
        } else {
            Self::Ticks(max_ticks)
        }
    }

    /// The configured maximum tick, or 0 for an immediate run.
    pub const fn max_ticks(self) -> u64 {
        match self {
            Self::Immediate => 0,
            Self::Ticks(max_ticks) => max_ticks,
        }
    }

    /// Whether `tick` satisfies the budget.
    pub const fn reached(self, tick: u64) -> bool {
        match self {
            Self::Immediate => true,
            Self::Ticks(max_ticks) => tick >= max_ticks,
        }
    }
}

/// Everything a single run owns and mutates.
#[derive(Debug)]
pub struct RunState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    status: StatusAggregator,
    gate: TickGate,
    milestones: Vec<Milestone>,
}

impl RunState {
    /// Fresh state for the given tracked rooms and milestone definitions.
    pub fn new<I, R>(tracked_rooms: I, milestones: Vec<Milestone>) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoomName>,
    {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            started: Instant::now(),
            status: StatusAggregator::new(tracked_rooms),
            gate: TickGate::new(),
            milestones,
        }
    }

    /// Unique id of this run.
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Latest tick observed from the feed (0 before the first snapshot).
    pub const fn last_tick(&self) -> u64 {
        self.gate.current_tick()
    }

    /// Current status table.
    pub const fn status(&self) -> &StatusAggregator {
        &self.status
    }

    /// Current milestone list.
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Handle one snapshot: always aggregate, evaluate only on a new tick.
    ///
    /// Returns the milestone changes from the evaluation pass, or an empty
    /// list when the tick was a repeat or stale.
    pub fn handle_event(&mut self, event: &TickEvent) -> Vec<MilestoneChange> {
        self.status.apply(event);
        match self.gate.observe(event.tick) {
            TickStep::New => {
                debug!(tick = event.tick, rooms = event.objects.len(), "evaluating tick");
                evaluate::evaluate(&mut self.milestones, &self.status, event.tick)
            }
            TickStep::Repeat => Vec::new(),
            TickStep::Stale => {
                warn!(
                    tick = event.tick,
                    last_tick = self.gate.current_tick(),
                    "snapshot older than the current tick, not evaluated"
                );
                Vec::new()
            }
        }
    }

    /// Build the final report.
    ///
    /// The verdict is computed for every end reason except
    /// [`EndReason::Cancelled`].
    pub fn finalize(&self, end_reason: EndReason) -> RunReport {
        let last_tick = self.last_tick();
        let verdict = (end_reason != EndReason::Cancelled)
            .then(|| verdict::verdict(&self.milestones, last_tick));
        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            end_reason,
            last_tick,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            status: self.status.snapshot(),
            milestones: self.milestones.clone(),
            verdict,
        }
    }
}

/// Feed snapshots into `state` until the budget is met or `cancel` fires.
///
/// A token that is already cancelled ends the wait before anything else.
/// With [`TickBudget::Immediate`] the feed is not read at all. Otherwise the
/// loop handles each snapshot as it arrives and wakes every `poll_interval`
/// to re-check the budget.
pub async fn await_ticks<S>(
    state: &mut RunState,
    feed: &mut S,
    budget: TickBudget,
    cancel: &CancelToken,
    poll_interval: Duration,
) -> EndReason
where
    S: Stream<Item = TickEvent> + Unpin,
{
    if cancel.is_cancelled() {
        info!(last_tick = state.last_tick(), "run cancelled before awaiting ticks");
        return EndReason::Cancelled;
    }
    let TickBudget::Ticks(max_ticks) = budget else {
        info!("no tick budget set, not waiting for ticks");
        return EndReason::Immediate;
    };

    info!(
        max_ticks = max_ticks,
        poll_interval_ms = poll_interval.as_millis(),
        "awaiting ticks"
    );

    let mut interval = tokio::time::interval(poll_interval.max(MIN_POLL_INTERVAL));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut feed_open = true;

    loop {
        if cancel.is_cancelled() {
            info!(last_tick = state.last_tick(), "run cancelled");
            return EndReason::Cancelled;
        }
        if budget.reached(state.last_tick()) {
            info!(
                last_tick = state.last_tick(),
                max_ticks = max_ticks,
                observed_rooms = state.status().observed_count(),
                tracked_rooms = state.status().tracked_count(),
                "tick budget reached"
            );
            return EndReason::BudgetReached;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            event = feed.next(), if feed_open => match event {
                Some(event) => {
                    let _ = state.handle_event(&event);
                }
                None => {
                    feed_open = false;
                    warn!(
                        last_tick = state.last_tick(),
                        max_ticks = max_ticks,
                        "event feed ended before the tick budget, waiting for cancellation"
                    );
                }
            },
            _ = interval.tick() => {
                debug!(last_tick = state.last_tick(), max_ticks = max_ticks, "waiting for ticks");
            }
        }
    }
}

/// Log the end of a run, one line per milestone plus a summary.
pub fn log_run_end(report: &RunReport) {
    for milestone in &report.milestones {
        match milestone.outcome() {
            Outcome::Succeeded => info!(
                milestone = milestone.description,
                tick_reached = milestone.tick_reached(),
                deadline_tick = milestone.deadline_tick,
                "milestone succeeded"
            ),
            Outcome::Failed => warn!(
                milestone = milestone.description,
                tick_reached = milestone.tick_reached(),
                deadline_tick = milestone.deadline_tick,
                required = milestone.required,
                "milestone reached too late"
            ),
            Outcome::Unresolved => info!(
                milestone = milestone.description,
                deadline_tick = milestone.deadline_tick,
                required = milestone.required,
                failed_rooms = ?milestone.failed_rooms(),
                "milestone unresolved"
            ),
        }
    }

    info!(
        run_id = %report.run_id,
        end_reason = ?report.end_reason,
        last_tick = report.last_tick,
        elapsed_ms = report.elapsed_ms,
        passed = report.verdict.as_ref().map(Verdict::passed),
        verdict = ?report.verdict,
        "run finished"
    );
}
