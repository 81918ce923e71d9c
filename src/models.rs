//! Domain records consumed by a planning run.
//!
//! All of these are immutable snapshots taken from the collaborating data
//! sources at the start of a run; nothing here is persisted by this crate.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::geometry::{Geometry, Point};

/// An active disaster's affected area plus its activity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub id: String,
    pub geometry: Geometry,
    /// Window start, unix seconds.
    pub starts_at: i64,
    /// Window end, unix seconds. `None` means open-ended.
    pub ends_at: Option<i64>,
}

impl HazardZone {
    /// Active iff `now` falls inside `[starts_at, ends_at)`.
    pub fn is_active_at(&self, now: i64) -> bool {
        if self.starts_at > now {
            return false;
        }
        match self.ends_at {
            Some(end) => end > now,
            None => true,
        }
    }
}

/// A person requiring evacuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub location: Point,
    /// Free-text accessibility notes (wheelchair, stretcher, oxygen, ...).
    #[serde(default)]
    pub needs: String,
    /// Preferred contact channel, when known.
    #[serde(default)]
    pub contact: Option<String>,
}

/// A fleet vehicle as reported by the fleet-state provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub vehicle_type: String,
    pub license_plate: String,
    pub location: Point,
    pub total_seats: u32,
    pub occupied_seats: u32,
}

impl Vehicle {
    /// Seats free for evacuees. Occupancy above the seat total clamps to 0.
    pub fn available_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.occupied_seats)
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
