use serde::{Deserialize, Serialize};

use crate::{Direction, Track};

/// Display name for a COCO vehicle class.
pub fn vehicle_type_name(class_id: usize) -> &'static str {
    match class_id {
        2 => "CAR",
        5 => "BUS",
        7 => "TRUCK",
        _ => "Vehicle",
    }
}

/// What gets handed to the violation sink for a counted vehicle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub timestamp_ms: f64,
    pub track_id: u64,
    pub vehicle_type: String,
    pub class_id: usize,
    pub direction: Direction,
    pub speed_kmh: f64,
    pub lane: Option<usize>,
    pub violation: bool,
    pub violation_reason: String,
    /// Filled in by a downstream plate reader, if any.
    pub license_plate: Option<String>,
}

impl VehicleRecord {
    pub fn from_track(track: &Track, direction: Direction, timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            track_id: track.id(),
            vehicle_type: vehicle_type_name(track.class_id()).to_string(),
            class_id: track.class_id(),
            direction,
            speed_kmh: track.speed_kmh(),
            lane: track.lane(),
            violation: track.is_violation(),
            violation_reason: track.violation_reason().to_string(),
            license_plate: None,
        }
    }
}
