//! # Harvester
//!
//! Episode orchestration and sensor-rig lifecycle engine.
//!
//! Owns the simulator connection, the actor population (ego, traffic, OOD),
//! town/weather rotation, the tick loop and the persistence schedule. Each
//! episode walks Idle → WorldLoading → PopulatingActors → Warmup →
//! MetadataWrite → Capturing → Teardown and leaves the world reusable for the
//! next one; the global frame index survives across episodes and across
//! process restarts.

mod environment;
mod ood;
mod persistence;
mod runner;
mod stats;
mod weather;

pub use environment::{Environment, CAPTURE_SUBDIVISION, WARMUP_TICKS};
pub use ood::{
    OodRegistry, OOD_MIN_SEPARATION, OOD_PLACEMENT_ATTEMPTS, OOD_PROXIMITY_LIMIT, OOD_TARGET_COUNT,
};
pub use persistence::{resume_count, DatasetWriter};
pub use runner::run;
pub use stats::EpisodeStats;
pub use weather::WeatherRotation;
