//! Aggregated per-room status.
//!
//! A [`RoomStatus`] is the folded view of every entity the simulation has
//! reported for one tracked room. Milestones only ever read the numeric
//! fields named by [`StatusField`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a room in the simulation (e.g. `W1N1`).
pub type RoomName = String;

/// Final status table as reported: one entry per tracked room.
pub type StatusTable = BTreeMap<RoomName, RoomStatus>;

/// A numeric [`RoomStatus`] field that a milestone can put a threshold on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    /// Number of active creeps in the room.
    Creeps,
    /// Controller progress within the current level.
    Progress,
    /// Controller level.
    Level,
    /// Number of built structures.
    Structures,
}

impl StatusField {
    /// Every checkable field, in reporting order.
    pub const ALL: [Self; 4] = [Self::Creeps, Self::Progress, Self::Level, Self::Structures];

    /// Field name as it appears in milestone definitions and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creeps => "creeps",
            Self::Progress => "progress",
            Self::Level => "level",
            Self::Structures => "structures",
        }
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated status of one tracked room.
///
/// Created zeroed at process start and mutated in place by every snapshot
/// that mentions the room. Never removed during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatus {
    /// Object id of the room controller, once discovered. Never cleared.
    pub controller_id: Option<String>,
    /// Active creeps in the room.
    pub creeps: u64,
    /// Controller progress counter. Resets when the controller levels up.
    pub progress: u64,
    /// Controller level.
    pub level: u64,
    /// Built structures in the room, controller excluded.
    pub structures: u64,
}

impl RoomStatus {
    /// Read the value of a checkable field.
    pub const fn value(&self, field: StatusField) -> u64 {
        match field {
            StatusField::Creeps => self.creeps,
            StatusField::Progress => self.progress,
            StatusField::Level => self.level,
            StatusField::Structures => self.structures,
        }
    }

    /// Whether `field` meets or exceeds `threshold`.
    pub const fn meets(&self, field: StatusField, threshold: u64) -> bool {
        self.value(field) >= threshold
    }
}
