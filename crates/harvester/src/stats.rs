//! Per-episode statistics.

use std::time::Duration;

/// Summary of one completed episode
#[derive(Debug, Default, Clone)]
pub struct EpisodeStats {
    /// Town the episode ran in
    pub town: String,

    /// Vehicles spawned (ego + traffic)
    pub vehicles_spawned: usize,

    /// OOD actors placed during population
    pub ood_spawned: usize,

    /// OOD actors destroyed and replaced for proximity violations
    pub ood_respawns: usize,

    /// Capture ticks executed
    pub capture_ticks: u64,

    /// Frame files written across all agents and sensors
    pub frames_persisted: u64,

    /// Wall-clock episode duration
    pub duration: Duration,
}

impl EpisodeStats {
    /// Persisted frames per wall-clock second
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.frames_persisted as f64 / secs
        } else {
            0.0
        }
    }
}
