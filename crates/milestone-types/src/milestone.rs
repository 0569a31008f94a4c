//! Milestone definitions and their sticky outcome.
//!
//! A milestone is a set of per-field thresholds that every tracked room must
//! meet before a deadline tick. Its outcome starts [`Outcome::Unresolved`]
//! and moves to a terminal value at most once. The outcome fields are
//! private so the only way to change them is through [`Milestone::resolve`]
//! and [`Milestone::record_deadline_miss`], both of which refuse to touch a
//! milestone that already has a terminal outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::{RoomName, StatusField};

/// Rooms that failed a milestone check, with the fields each one missed.
pub type FailedRooms = BTreeMap<RoomName, Vec<StatusField>>;

/// Tri-state milestone outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The check has not been satisfied yet.
    #[default]
    Unresolved,
    /// The check was first satisfied before the deadline tick.
    Succeeded,
    /// The check was first satisfied at or after the deadline tick.
    Failed,
}

impl Outcome {
    /// Whether this outcome is terminal.
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// A named condition over the status table that must hold by a given tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Human-readable label, also used as the milestone's identity in reports.
    pub description: String,

    /// Minimum value per field; every tracked room must meet all of them.
    #[serde(default)]
    pub check: BTreeMap<StatusField, u64>,

    /// Tick by which the check must first become satisfied.
    #[serde(alias = "tick")]
    pub deadline_tick: u64,

    /// Whether missing this milestone fails the run.
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_deserializing)]
    success: Outcome,

    #[serde(default, skip_deserializing)]
    tick_reached: Option<u64>,

    #[serde(default, skip_deserializing)]
    failed_rooms: Option<FailedRooms>,
}

impl Milestone {
    /// Create an unresolved milestone.
    pub fn new(
        description: impl Into<String>,
        check: BTreeMap<StatusField, u64>,
        deadline_tick: u64,
        required: bool,
    ) -> Self {
        Self {
            description: description.into(),
            check,
            deadline_tick,
            required,
            success: Outcome::Unresolved,
            tick_reached: None,
            failed_rooms: None,
        }
    }

    /// Current outcome.
    pub const fn outcome(&self) -> Outcome {
        self.success
    }

    /// Tick at which the check was first satisfied, if it has been.
    pub const fn tick_reached(&self) -> Option<u64> {
        self.tick_reached
    }

    /// Rooms failing the check at the deadline tick, if the deadline was
    /// observed while the milestone was still unresolved.
    pub const fn failed_rooms(&self) -> Option<&FailedRooms> {
        self.failed_rooms.as_ref()
    }

    /// Record that the check became satisfied at `tick`.
    ///
    /// The outcome is [`Outcome::Succeeded`] when `tick < deadline_tick`
    /// and [`Outcome::Failed`] otherwise. Returns the new outcome, or `None`
    /// if the milestone was already resolved (in which case nothing changes).
    pub const fn resolve(&mut self, tick: u64) -> Option<Outcome> {
        if self.success.is_resolved() {
            return None;
        }
        let outcome = if tick < self.deadline_tick {
            Outcome::Succeeded
        } else {
            Outcome::Failed
        };
        self.success = outcome;
        self.tick_reached = Some(tick);
        Some(outcome)
    }

    /// Record the rooms failing the check at the deadline tick.
    ///
    /// Leaves the outcome unresolved. Returns `false` without changing
    /// anything if the milestone is resolved or a miss was already recorded.
    pub fn record_deadline_miss(&mut self, rooms: FailedRooms) -> bool {
        if self.success.is_resolved() || self.failed_rooms.is_some() {
            return false;
        }
        self.failed_rooms = Some(rooms);
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn level_two(deadline: u64) -> Milestone {
        Milestone::new(
            "controller level 2",
            BTreeMap::from([(StatusField::Level, 2)]),
            deadline,
            true,
        )
    }

    #[test]
    fn resolve_before_deadline_succeeds() {
        let mut milestone = level_two(50);
        assert_eq!(milestone.resolve(40), Some(Outcome::Succeeded));
        assert_eq!(milestone.tick_reached(), Some(40));
    }

    #[test]
    fn resolve_on_deadline_is_too_late() {
        let mut milestone = level_two(50);
        assert_eq!(milestone.resolve(50), Some(Outcome::Failed));
        assert_eq!(milestone.tick_reached(), Some(50));
    }

    #[test]
    fn resolve_is_sticky() {
        let mut milestone = level_two(50);
        let _ = milestone.resolve(60);
        assert_eq!(milestone.resolve(10), None);
        assert_eq!(milestone.outcome(), Outcome::Failed);
        assert_eq!(milestone.tick_reached(), Some(60));
    }

    #[test]
    fn deadline_miss_keeps_outcome_unresolved() {
        let mut milestone = level_two(50);
        let rooms = FailedRooms::from([("W1N1".to_owned(), vec![StatusField::Level])]);
        assert!(milestone.record_deadline_miss(rooms.clone()));
        assert_eq!(milestone.outcome(), Outcome::Unresolved);
        assert_eq!(milestone.failed_rooms(), Some(&rooms));
        assert!(!milestone.record_deadline_miss(FailedRooms::new()));
        assert_eq!(milestone.failed_rooms(), Some(&rooms));
    }

    #[test]
    fn deadline_miss_ignored_once_resolved() {
        let mut milestone = level_two(50);
        let _ = milestone.resolve(10);
        assert!(!milestone.record_deadline_miss(FailedRooms::new()));
        assert_eq!(milestone.failed_rooms(), None);
    }

    #[test]
    fn definition_cannot_preset_outcome() {
        let json = serde_json::json!({
            "description": "first creep",
            "check": {"creeps": 1},
            "tick": 30,
            "required": true,
            "success": "succeeded",
            "tick_reached": 3
        });
        let milestone: Milestone = serde_json::from_value(json).unwrap();
        assert_eq!(milestone.deadline_tick, 30);
        assert_eq!(milestone.outcome(), Outcome::Unresolved);
        assert_eq!(milestone.tick_reached(), None);
    }
}
