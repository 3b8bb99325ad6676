// lanewatch-track/src/lib.rs
// ============================================================
// lanewatch-track  –  per-vehicle state across frames
// Owns the live track set: association, class voting, speed
// smoothing, missed-frame aging and violation rules.
// ------------------------------------------------------------
// Per frame: Vec<Detection> + LaneModel → TrackManager::step
//            → updated tracks → DirectionCounter → VehicleRecord
// ------------------------------------------------------------
// Public API
//   * Track::{update, missed, check_violation}
//   * TrackManager::step(detections, ts_ms, lanes)
//   * Matcher / GreedyIouMatcher – detection ↔ track assignment
//   * DirectionCounter           – one-shot L/F/R counting
// ============================================================

use thiserror::Error;

mod config;
mod counter;
mod manager;
mod matcher;
mod record;
mod track;

pub use config::TrackConfig;
pub use counter::{Direction, DirectionCounter};
pub use manager::TrackManager;
pub use matcher::{Assignment, GreedyIouMatcher, Matcher};
pub use record::{vehicle_type_name, VehicleRecord};
pub use track::{Track, NORMAL};

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Timestamp must be finite, got {0}")]
    InvalidTimestamp(f64),
}

pub type Result<T> = std::result::Result<T, TrackError>;
