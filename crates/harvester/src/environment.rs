//! Episode orchestrator.
//!
//! Owns the simulator client, the actor population and the tick loop. Each
//! episode walks WorldLoading → PopulatingActors → Warmup → MetadataWrite →
//! Capturing → Teardown; teardown runs even when a phase fails so no native
//! handle outlives its episode.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::{atomic::AtomicBool, Arc};
use std::time::{Duration, Instant};

use actors::{RigSpec, SimClient, Vehicle, VehicleRole, REFERENCE_SENSOR};
use contracts::{
    ActorId, EpisodeConfig, HarvestConfig, HarvestError, MapLayer, Result, RigCalibrationFile,
    TOWN_ROTATION,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, instrument};

use crate::ood::OodRegistry;
use crate::persistence::{resume_count, DatasetWriter};
use crate::stats::EpisodeStats;
use crate::weather::WeatherRotation;

/// World steps per capture tick
pub const CAPTURE_SUBDIVISION: u32 = 5;

/// Untracked steps before capturing starts, letting physics and sensors
/// settle
pub const WARMUP_TICKS: u32 = 5;

/// Pause before and after actor destruction so native callbacks flush
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Actor population of one episode
#[derive(Default)]
struct Fleet {
    vehicles: Vec<Vehicle>,
    ood: OodRegistry,
}

impl Fleet {
    fn bodies(&self) -> Vec<ActorId> {
        self.vehicles
            .iter()
            .filter_map(|vehicle| vehicle.body())
            .collect()
    }

    fn egos(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter().filter(|vehicle| vehicle.is_ego())
    }
}

/// Episode orchestration engine.
///
/// Exactly one simulator client is owned per environment; `run_episode`
/// replaces the world wholesale, so actor handles never survive across
/// episodes. The global frame index survives both episodes and (via resume
/// seeding) process restarts.
pub struct Environment<C: SimClient> {
    client: C,
    tick_interval: f64,
    tm_port: u16,
    towns: Vec<String>,
    town_cursor: usize,
    weather: WeatherRotation,
    frame_index: u64,
    settle_delay: Duration,
    shutdown: Arc<AtomicBool>,
    rng: StdRng,
}

impl<C: SimClient> Environment<C> {
    pub fn new(client: C, config: &HarvestConfig, shutdown: Arc<AtomicBool>) -> Self {
        let towns = config.world.towns.clone().unwrap_or_else(|| {
            TOWN_ROTATION.iter().map(|town| town.to_string()).collect()
        });

        Self {
            client,
            tick_interval: config.world.tick_interval,
            tm_port: config.connection.traffic_manager_port,
            towns,
            town_cursor: 0,
            weather: WeatherRotation::new(),
            frame_index: 0,
            settle_delay: SETTLE_DELAY,
            shutdown,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic randomness for tests
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Override the teardown settle delay (tests run with zero)
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Seed the frame index from configuration, or by resuming from the
    /// number of frames already written for agent 0's reference sensor so a
    /// re-run appends instead of overwriting.
    pub fn resolve_start_frame(
        &mut self,
        configured: Option<u64>,
        save_path: &Path,
    ) -> Result<u64> {
        let start = match configured {
            Some(index) => index,
            None => resume_count(save_path, REFERENCE_SENSOR)?,
        };
        self.frame_index = start;
        info!(start, "frame index seeded");
        Ok(start)
    }

    /// Run one full episode.
    ///
    /// The world reload happens strictly before any spawn — it invalidates
    /// every handle from the previous episode. Teardown runs regardless of
    /// how the capture phases end.
    #[instrument(name = "run_episode", skip_all, fields(frame_index = self.frame_index))]
    pub async fn run_episode(
        &mut self,
        episode: &EpisodeConfig,
        rig: &RigSpec,
    ) -> Result<EpisodeStats> {
        if rig.is_empty() {
            return Err(HarvestError::config_validation(
                "rig",
                "ego rig must define at least one camera",
            ));
        }
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(HarvestError::Interrupted);
        }

        let started = Instant::now();

        let town = self.towns[self.town_cursor % self.towns.len()].clone();
        self.town_cursor += 1;

        info!(town = %town, "loading world");
        self.client.load_world(&town).await?;
        self.client.unload_layer(MapLayer::Foliage).await?;
        self.client.unload_layer(MapLayer::ParkedVehicles).await?;
        self.client.configure_sync_stepping(self.tick_interval).await?;

        let mut fleet = Fleet::default();
        let result = self.run_phases(episode, rig, &mut fleet).await;
        self.teardown(&mut fleet).await;

        result.map(|mut stats| {
            stats.town = town;
            stats.duration = started.elapsed();
            observability::record_episode_completed();
            stats
        })
    }

    async fn run_phases(
        &mut self,
        episode: &EpisodeConfig,
        rig: &RigSpec,
        fleet: &mut Fleet,
    ) -> Result<EpisodeStats> {
        let mut stats = EpisodeStats::default();

        // PopulatingActors
        for _ in 0..episode.num_ego {
            let vehicle = Vehicle::spawn(
                &self.client,
                &mut self.rng,
                VehicleRole::Ego,
                rig,
                self.tm_port,
                &self.shutdown,
            )
            .await?;
            observability::record_actor_spawned("ego");
            fleet.vehicles.push(vehicle);
        }
        for _ in 0..episode.num_traffic {
            let vehicle = Vehicle::spawn(
                &self.client,
                &mut self.rng,
                VehicleRole::Traffic,
                rig,
                self.tm_port,
                &self.shutdown,
            )
            .await?;
            observability::record_actor_spawned("traffic");
            fleet.vehicles.push(vehicle);
        }
        stats.vehicles_spawned = fleet.vehicles.len();

        let spawn_points = if episode.ood_classes.is_some() {
            self.client.spawn_points().await?
        } else {
            Vec::new()
        };

        if let Some(classes) = &episode.ood_classes {
            fleet.ood = OodRegistry::new(classes.clone());
            let bodies = fleet.bodies();
            stats.ood_spawned = fleet
                .ood
                .populate(
                    &self.client,
                    &mut self.rng,
                    &spawn_points,
                    &bodies,
                    &self.shutdown,
                )
                .await?;
        }

        // Warmup
        debug!(ticks = WARMUP_TICKS, "warming up world");
        for _ in 0..WARMUP_TICKS {
            self.client.tick().await?;
        }

        // MetadataWrite
        let mut writer = DatasetWriter::new(&episode.save_path)?;
        for (agent_index, vehicle) in fleet.egos().enumerate() {
            let mut rig_file = RigCalibrationFile::default();
            for (name, camera) in vehicle.cameras() {
                rig_file.sensors.insert(
                    name.clone(),
                    calibration::sensor_calibration(camera.kind(), camera.mount(), camera.options()),
                );
            }
            writer.write_calibration(agent_index, &rig_file)?;
        }

        // Capturing
        let total_steps = episode.episode_length * CAPTURE_SUBDIVISION;
        let weather_period = (episode.episode_length / 2).max(1) as u64;

        for step in 0..total_steps {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(HarvestError::Interrupted);
            }

            if step % CAPTURE_SUBDIVISION == 0 {
                if stats.capture_ticks % weather_period == 0 {
                    let preset = self.weather.advance();
                    debug!(preset = ?preset, "advancing weather");
                    self.client.set_weather(preset).await?;
                }

                for (agent_index, vehicle) in fleet.egos().enumerate() {
                    vehicle.tick();
                    for (name, camera) in vehicle.cameras() {
                        let frame = camera.fetch();
                        writer.write_frame(agent_index, name, self.frame_index, &frame)?;
                        observability::record_frame_persisted();
                        stats.frames_persisted += 1;
                    }
                }

                // One shared index per capture tick, across all sensors and
                // agents
                self.frame_index += 1;
                stats.capture_ticks += 1;
                observability::record_frame_index(self.frame_index);

                if fleet.ood.enabled() {
                    let bodies = fleet.bodies();
                    let respawns = fleet
                        .ood
                        .enforce_separation(
                            &self.client,
                            &mut self.rng,
                            &spawn_points,
                            &bodies,
                            &self.shutdown,
                        )
                        .await?;
                    if respawns > 0 {
                        observability::record_ood_respawns(respawns as u64);
                    }
                    stats.ood_respawns += respawns;
                }
            }

            self.client.tick().await?;
        }

        Ok(stats)
    }

    /// Destroy every actor of the episode, with a settle delay on both sides
    /// so native destruction callbacks flush.
    #[instrument(name = "episode_teardown", skip_all)]
    async fn teardown(&mut self, fleet: &mut Fleet) {
        tokio::time::sleep(self.settle_delay).await;

        for vehicle in &mut fleet.vehicles {
            vehicle.destroy(&self.client).await;
        }
        fleet.vehicles.clear();
        fleet.ood.destroy_all(&self.client).await;

        tokio::time::sleep(self.settle_delay).await;
        debug!("teardown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actors::{MockSimClient, MockSimConfig};
    use contracts::HarvestConfig;
    use std::time::Duration as StdDuration;

    fn config(save_path: &Path, episode_length: u32) -> HarvestConfig {
        serde_json::from_value(serde_json::json!({
            "run": {
                "save_path": save_path,
                "episode_length": episode_length,
                "num_ego": 1,
                "num_traffic": 0,
            }
        }))
        .unwrap()
    }

    async fn environment(
        config: &HarvestConfig,
        mock: MockSimConfig,
    ) -> Environment<MockSimClient> {
        let mut client = MockSimClient::with_config(mock);
        client
            .connect("localhost", 2000, StdDuration::from_secs(5))
            .await
            .unwrap();
        Environment::new(client, config, Arc::new(AtomicBool::new(false)))
            .with_rng_seed(3)
            .with_settle_delay(StdDuration::ZERO)
    }

    #[tokio::test]
    async fn episode_runs_expected_world_steps() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 2);
        let mut env = environment(&config, MockSimConfig::default()).await;

        let stats = env
            .run_episode(&config.episode(), &RigSpec::ego_default())
            .await
            .unwrap();

        assert_eq!(stats.capture_ticks, 2);
        // 5 warmup ticks + episode_length × subdivision
        assert_eq!(env.client().tick_count(), 5 + 10);
        assert!(env.client().is_synchronous());
    }

    #[tokio::test]
    async fn towns_rotate_round_robin() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 1);
        let mut env = environment(&config, MockSimConfig::default()).await;
        let episode = config.episode();
        let rig = RigSpec::ego_default();

        env.run_episode(&episode, &rig).await.unwrap();
        assert_eq!(env.client().loaded_map().as_deref(), Some("Town01"));
        env.run_episode(&episode, &rig).await.unwrap();
        assert_eq!(env.client().loaded_map().as_deref(), Some("Town02"));
    }

    #[tokio::test]
    async fn frame_index_survives_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 3);
        let mut env = environment(&config, MockSimConfig::default()).await;
        let episode = config.episode();
        let rig = RigSpec::ego_default();

        env.run_episode(&episode, &rig).await.unwrap();
        assert_eq!(env.frame_index(), 3);
        env.run_episode(&episode, &rig).await.unwrap();
        assert_eq!(env.frame_index(), 6);
    }

    #[tokio::test]
    async fn teardown_leaves_world_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 1);
        let mut env = environment(&config, MockSimConfig::default()).await;

        env.run_episode(&config.episode(), &RigSpec::ego_default())
            .await
            .unwrap();
        assert_eq!(env.client().actor_count(), 0);
    }

    #[tokio::test]
    async fn step_failure_is_fatal_but_still_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 2);
        // First 2 warmup ticks succeed, then stepping fails
        let mut env = environment(
            &config,
            MockSimConfig {
                fail_tick_after: Some(2),
                ..Default::default()
            },
        )
        .await;

        let err = env
            .run_episode(&config.episode(), &RigSpec::ego_default())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Step { .. }));
        assert_eq!(env.client().actor_count(), 0);
    }

    #[tokio::test]
    async fn empty_rig_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 1);
        let mut env = environment(&config, MockSimConfig::default()).await;

        let rig = RigSpec::new(Vec::new()).unwrap();
        let err = env.run_episode(&config.episode(), &rig).await.unwrap_err();
        assert!(matches!(err, HarvestError::ConfigValidation { .. }));
    }
}
