//! Milestone evaluation.
//!
//! [`evaluate`] runs once per distinct tick. Every milestone that is still
//! unresolved is checked against the full tracked-room set; resolved
//! milestones are skipped without logging.
//!
//! A deadline miss is only recorded when the evaluated tick is exactly the
//! milestone's deadline tick. If the feed skips over the deadline tick
//! (e.g. 48 then 51 with a deadline of 50) no miss is recorded; the
//! milestone still counts as failed in the verdict once the run ends past
//! its deadline.

use std::collections::BTreeMap;

use milestone_types::{FailedRooms, Milestone, Outcome, StatusField};
use tracing::{info, warn};

use crate::aggregate::StatusAggregator;

/// What happened to one milestone during an evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestoneChange {
    /// The check was satisfied for the first time.
    Reached {
        /// Milestone description.
        description: String,
        /// Resulting outcome (on time or too late).
        outcome: Outcome,
    },
    /// The deadline tick was evaluated while the check still failed.
    DeadlineMissed {
        /// Milestone description.
        description: String,
        /// Rooms failing the check at the deadline.
        failed_rooms: FailedRooms,
    },
}

/// Advance every unresolved milestone for `tick`.
///
/// Returns the changes made during this pass, in milestone order.
pub fn evaluate(
    milestones: &mut [Milestone],
    status: &StatusAggregator,
    tick: u64,
) -> Vec<MilestoneChange> {
    let mut changes = Vec::new();

    for milestone in milestones.iter_mut() {
        if milestone.outcome().is_resolved() {
            continue;
        }

        if is_satisfied(&milestone.check, status) {
            let Some(outcome) = milestone.resolve(tick) else {
                continue;
            };
            if outcome == Outcome::Succeeded {
                info!(
                    milestone = milestone.description,
                    tick = tick,
                    deadline_tick = milestone.deadline_tick,
                    "milestone reached on time"
                );
            } else {
                warn!(
                    milestone = milestone.description,
                    tick = tick,
                    deadline_tick = milestone.deadline_tick,
                    required = milestone.required,
                    "milestone reached too late"
                );
            }
            changes.push(MilestoneChange::Reached {
                description: milestone.description.clone(),
                outcome,
            });
        } else if tick == milestone.deadline_tick {
            let failed_rooms = failing_rooms(&milestone.check, status);
            if !milestone.record_deadline_miss(failed_rooms.clone()) {
                continue;
            }
            warn!(
                milestone = milestone.description,
                tick = tick,
                required = milestone.required,
                failed_rooms = ?failed_rooms,
                "milestone deadline missed"
            );
            changes.push(MilestoneChange::DeadlineMissed {
                description: milestone.description.clone(),
                failed_rooms,
            });
        }
    }

    changes
}

/// Whether every tracked room has been reported and meets every threshold.
fn is_satisfied(check: &BTreeMap<StatusField, u64>, status: &StatusAggregator) -> bool {
    status.is_fully_populated()
        && status.rooms().all(|(_, room_status, _)| {
            check
                .iter()
                .all(|(field, threshold)| room_status.meets(*field, *threshold))
        })
}

/// Rooms failing `check`, with the fields each one misses.
///
/// A tracked room the feed has not reported yet fails every field.
fn failing_rooms(check: &BTreeMap<StatusField, u64>, status: &StatusAggregator) -> FailedRooms {
    status
        .rooms()
        .filter_map(|(room, room_status, observed)| {
            let missed: Vec<StatusField> = check
                .iter()
                .filter(|(field, threshold)| !observed || !room_status.meets(**field, **threshold))
                .map(|(field, _)| *field)
                .collect();
            (!observed || !missed.is_empty()).then(|| (room.clone(), missed))
        })
        .collect()
}
