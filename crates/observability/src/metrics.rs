//! Harvest-loop metric recording helpers.
//!
//! Thin wrappers over the `metrics` facade so call sites stay one-liners and
//! metric names live in exactly one place.

use metrics::{counter, describe_counter, describe_gauge, gauge};

const FRAMES_PERSISTED: &str = "harvest_frames_persisted_total";
const ACTORS_SPAWNED: &str = "harvest_actors_spawned_total";
const OOD_RESPAWNS: &str = "harvest_ood_respawns_total";
const EPISODES: &str = "harvest_episodes_total";
const FRAME_INDEX: &str = "harvest_frame_index";

/// Register metric descriptions with the installed recorder
pub fn describe() {
    describe_counter!(FRAMES_PERSISTED, "Frame files written to the dataset");
    describe_counter!(ACTORS_SPAWNED, "Actors spawned, labeled by role");
    describe_counter!(OOD_RESPAWNS, "OOD actors evicted and respawned");
    describe_counter!(EPISODES, "Episodes completed");
    describe_gauge!(FRAME_INDEX, "Current global frame index");
}

/// One frame file persisted
pub fn record_frame_persisted() {
    counter!(FRAMES_PERSISTED).increment(1);
}

/// One actor spawned; `role` is "ego", "traffic" or "ood"
pub fn record_actor_spawned(role: &'static str) {
    counter!(ACTORS_SPAWNED, "role" => role).increment(1);
}

/// OOD actors evicted and respawned in one capture tick
pub fn record_ood_respawns(count: u64) {
    counter!(OOD_RESPAWNS).increment(count);
}

/// One episode completed
pub fn record_episode_completed() {
    counter!(EPISODES).increment(1);
}

/// Current global frame index
pub fn record_frame_index(index: u64) {
    gauge!(FRAME_INDEX).set(index as f64);
}
