//! Snapshot events delivered by the simulation feed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::RoomName;

/// One snapshot record from the simulation feed.
///
/// `objects` maps a room name to that room's object map (`objectId ->
/// entity fields`). Entity payloads are kept as raw JSON: the aggregator
/// reads the fields it understands and skips anything malformed. A `null`
/// entity means the object no longer exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    /// Simulation tick this snapshot belongs to.
    pub tick: u64,

    /// Entity updates keyed by room, then by object id.
    #[serde(default)]
    pub objects: BTreeMap<RoomName, serde_json::Value>,
}

impl TickEvent {
    /// An event for `tick` carrying no entity updates.
    pub const fn empty(tick: u64) -> Self {
        Self {
            tick,
            objects: BTreeMap::new(),
        }
    }
}
