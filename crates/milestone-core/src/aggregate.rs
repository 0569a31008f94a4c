//! Folding snapshot events into the per-room status table.
//!
//! Every tracked room keeps an index of the objects the feed has reported
//! for it (`objectId -> kind`). Entity updates are merged into that index
//! and the `creeps` / `structures` counters are derived from it, so the same
//! event can be applied twice without inflating the counts and partial
//! updates do not wipe objects they do not mention.
//!
//! Entity payloads come straight from the simulation. Anything that is not
//! shaped as expected is skipped rather than reported as an error.

use std::collections::BTreeMap;

use milestone_types::{RoomName, RoomStatus, StatusTable, TickEvent};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Built structure types counted towards [`RoomStatus::structures`].
const STRUCTURE_TYPES: &[&str] = &[
    "spawn",
    "extension",
    "road",
    "constructedWall",
    "rampart",
    "link",
    "storage",
    "tower",
    "observer",
    "powerSpawn",
    "extractor",
    "lab",
    "terminal",
    "container",
    "nuker",
    "factory",
];

/// Classification of a reported object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A mobile unit.
    Creep,
    /// The room controller.
    Controller,
    /// A built structure.
    Structure,
    /// Anything else (sources, minerals, construction sites, ...).
    Other,
}

impl EntityKind {
    /// Classify an object by its `type` field.
    pub fn from_type(object_type: &str) -> Self {
        match object_type {
            "creep" => Self::Creep,
            "controller" => Self::Controller,
            t if STRUCTURE_TYPES.contains(&t) => Self::Structure,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TrackedRoom {
    status: RoomStatus,
    objects: BTreeMap<String, EntityKind>,
    observed: bool,
}

impl TrackedRoom {
    fn apply_objects(&mut self, objects: &Map<String, Value>) {
        for (id, fields) in objects {
            self.apply_entity(id, fields);
        }
        self.recount();
    }

    fn apply_entity(&mut self, id: &str, fields: &Value) {
        if fields.is_null() {
            self.objects.remove(id);
            return;
        }
        let Some(fields) = fields.as_object() else {
            trace!(object_id = id, "skipping malformed entity");
            return;
        };

        let kind = match fields.get("type").and_then(Value::as_str) {
            Some(object_type) => EntityKind::from_type(object_type),
            None => match self.objects.get(id) {
                Some(kind) => *kind,
                None if self.status.controller_id.as_deref() == Some(id) => EntityKind::Controller,
                // Untyped update for an object we have never seen.
                None => return,
            },
        };
        self.objects.insert(id.to_owned(), kind);

        if kind == EntityKind::Controller {
            let controller_id = self.status.controller_id.get_or_insert_with(|| id.to_owned());
            if controller_id.as_str() != id {
                return;
            }
            if let Some(level) = fields.get("level").and_then(Value::as_u64) {
                self.status.level = level;
            }
            if let Some(progress) = fields.get("progress").and_then(Value::as_u64) {
                self.status.progress = progress;
            }
        }
    }

    fn recount(&mut self) {
        self.status.creeps = self.count(EntityKind::Creep);
        self.status.structures = self.count(EntityKind::Structure);
    }

    fn count(&self, kind: EntityKind) -> u64 {
        let n = self.objects.values().filter(|k| **k == kind).count();
        u64::try_from(n).unwrap_or(u64::MAX)
    }
}

/// Per-room status table for the configured tracked rooms.
#[derive(Debug, Clone, Default)]
pub struct StatusAggregator {
    rooms: BTreeMap<RoomName, TrackedRoom>,
}

impl StatusAggregator {
    /// Create a table with a zeroed entry for every tracked room.
    pub fn new<I, R>(tracked_rooms: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoomName>,
    {
        let rooms = tracked_rooms
            .into_iter()
            .map(|room| (room.into(), TrackedRoom::default()))
            .collect();
        Self { rooms }
    }

    /// Fold one snapshot into the table.
    ///
    /// Rooms that are not tracked are ignored. A room entry that is not an
    /// object map still marks the room as observed but changes nothing else.
    pub fn apply(&mut self, event: &TickEvent) {
        for (room_name, objects) in &event.objects {
            let Some(room) = self.rooms.get_mut(room_name) else {
                trace!(room = room_name, tick = event.tick, "ignoring untracked room");
                continue;
            };
            room.observed = true;
            match objects.as_object() {
                Some(objects) => room.apply_objects(objects),
                None if objects.is_null() => {}
                None => debug!(
                    room = room_name,
                    tick = event.tick,
                    "room payload is not an object map, skipping"
                ),
            }
        }
    }

    /// Number of configured tracked rooms.
    pub fn tracked_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of tracked rooms the feed has reported at least once.
    pub fn observed_count(&self) -> usize {
        self.rooms.values().filter(|room| room.observed).count()
    }

    /// Whether every tracked room has been reported at least once.
    pub fn is_fully_populated(&self) -> bool {
        self.observed_count() == self.tracked_count()
    }

    /// Status of one tracked room.
    pub fn status(&self, room: &str) -> Option<&RoomStatus> {
        self.rooms.get(room).map(|r| &r.status)
    }

    /// Iterate over `(room, status, observed)` for every tracked room.
    pub fn rooms(&self) -> impl Iterator<Item = (&RoomName, &RoomStatus, bool)> {
        self.rooms
            .iter()
            .map(|(name, room)| (name, &room.status, room.observed))
    }

    /// Copy of the current status table.
    pub fn snapshot(&self) -> StatusTable {
        self.rooms
            .iter()
            .map(|(name, room)| (name.clone(), room.status.clone()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(tick: u64, objects: Value) -> TickEvent {
        serde_json::from_value(json!({ "tick": tick, "objects": objects }))
            .unwrap()
    }

    #[test]
    fn tracked_count_ignores_duplicate_rooms() {
        let table = StatusAggregator::new(["W1N1", "W1N1", "W2N2"]);
        assert_eq!(table.tracked_count(), 2);
    }

    #[test]
    fn new_table_is_zeroed_and_unobserved() {
        let table = StatusAggregator::new(["W1N1", "W2N2"]);
        assert_eq!(table.tracked_count(), 2);
        assert_eq!(table.observed_count(), 0);
        assert_eq!(table.status("W1N1"), Some(&RoomStatus::default()));
    }

    #[test]
    fn counts_creeps_structures_and_controller() {
        let mut table = StatusAggregator::new(["W1N1"]);
        table.apply(&event(
            1,
            json!({"W1N1": {
                "c": {"type": "controller", "level": 2, "progress": 40},
                "k1": {"type": "creep"},
                "k2": {"type": "creep"},
                "s1": {"type": "spawn"},
                "s2": {"type": "extension"},
                "src": {"type": "source"}
            }}),
        ));
        let status = table.status("W1N1").cloned().unwrap();
        assert_eq!(status.controller_id.as_deref(), Some("c"));
        assert_eq!(status.level, 2);
        assert_eq!(status.progress, 40);
        assert_eq!(status.creeps, 2);
        assert_eq!(status.structures, 2);
    }

    #[test]
    fn reapplying_same_event_is_idempotent() {
        let mut table = StatusAggregator::new(["W1N1"]);
        let e = event(5, json!({"W1N1": {"k1": {"type": "creep"}}}));
        table.apply(&e);
        table.apply(&e);
        assert_eq!(table.status("W1N1").map(|s| s.creeps), Some(1));
    }

    #[test]
    fn null_entity_removes_object() {
        let mut table = StatusAggregator::new(["W1N1"]);
        table.apply(&event(1, json!({"W1N1": {"k1": {"type": "creep"}, "k2": {"type": "creep"}}})));
        table.apply(&event(2, json!({"W1N1": {"k1": null}})));
        assert_eq!(table.status("W1N1").map(|s| s.creeps), Some(1));
    }

    #[test]
    fn untyped_controller_update_uses_known_id() {
        let mut table = StatusAggregator::new(["W1N1"]);
        table.apply(&event(1, json!({"W1N1": {"c": {"type": "controller", "level": 1}}})));
        table.apply(&event(2, json!({"W1N1": {"c": {"progress": 250}}})));
        let status = table.status("W1N1").cloned().unwrap();
        assert_eq!(status.level, 1);
        assert_eq!(status.progress, 250);
    }

    #[test]
    fn controller_id_is_never_replaced() {
        let mut table = StatusAggregator::new(["W1N1"]);
        table.apply(&event(1, json!({"W1N1": {"c": {"type": "controller"}}})));
        table.apply(&event(2, json!({"W1N1": {"other": {"type": "controller", "level": 3}}})));
        let status = table.status("W1N1").cloned().unwrap();
        assert_eq!(status.controller_id.as_deref(), Some("c"));
        assert_eq!(status.level, 0);
    }

    #[test]
    fn progress_resets_on_level_up() {
        let mut table = StatusAggregator::new(["W1N1"]);
        table.apply(&event(1, json!({"W1N1": {"c": {"type": "controller", "level": 1, "progress": 190}}})));
        table.apply(&event(2, json!({"W1N1": {"c": {"level": 2, "progress": 0}}})));
        let status = table.status("W1N1").cloned().unwrap();
        assert_eq!((status.level, status.progress), (2, 0));
    }

    #[test]
    fn untracked_rooms_and_malformed_entities_are_skipped() {
        let mut table = StatusAggregator::new(["W1N1"]);
        table.apply(&event(
            1,
            json!({
                "E9S9": {"k": {"type": "creep"}},
                "W1N1": {"bad": 7, "k": {"type": "creep"}, "c": {"type": "controller", "level": "two"}}
            }),
        ));
        assert_eq!(table.tracked_count(), 1);
        let status = table.status("W1N1").cloned().unwrap();
        assert_eq!(status.creeps, 1);
        assert_eq!(status.level, 0);
    }

    #[test]
    fn empty_room_entry_marks_room_observed() {
        let mut table = StatusAggregator::new(["W1N1", "W2N2"]);
        table.apply(&event(1, json!({"W1N1": {}})));
        assert_eq!(table.observed_count(), 1);
        assert!(!table.is_fully_populated());
        table.apply(&event(2, json!({"W2N2": {}})));
        assert!(table.is_fully_populated());
    }

    #[test]
    fn empty_event_changes_nothing() {
        let mut table = StatusAggregator::new(["W1N1"]);
        table.apply(&TickEvent::empty(3));
        assert_eq!(table.observed_count(), 0);
        assert_eq!(table.snapshot().get("W1N1"), Some(&RoomStatus::default()));
    }
}
