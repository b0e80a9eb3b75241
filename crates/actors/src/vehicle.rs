//! Vehicle lifecycle: spawn-with-retry, rig attachment, per-tick sensor
//! polling, idempotent teardown.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{ActorId, HarvestError, Result, Transform};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::blueprint::{traffic_candidates, EGO_BLUEPRINT};
use crate::camera::Camera;
use crate::client::SimClient;
use crate::rig::RigSpec;

/// Placement attempts before a vehicle spawn is declared exhausted
pub const MAX_SPAWN_ATTEMPTS: u32 = 50;

/// Role a vehicle plays in the episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleRole {
    /// Carries the camera rig; subject of data collection
    Ego,
    /// Background traffic, unsensored
    Traffic,
}

/// One vehicle in the world: an exclusively-owned body handle plus the
/// ordered camera rig (non-empty iff ego).
pub struct Vehicle {
    role: VehicleRole,
    blueprint: String,
    body: Option<ActorId>,
    cameras: Vec<(String, Camera)>,
}

impl std::fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vehicle")
            .field("role", &self.role)
            .field("blueprint", &self.blueprint)
            .field("body", &self.body)
            .field(
                "cameras",
                &self.cameras.iter().map(|(slot, _)| slot).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Vehicle {
    /// Spawn a vehicle body and, for ego vehicles, its camera rig.
    ///
    /// Placement retries over uniformly-random spawn points until the
    /// simulator accepts one, bounded by [`MAX_SPAWN_ATTEMPTS`]. The body is
    /// delegated to the traffic-coordination service immediately after
    /// placement.
    #[instrument(name = "vehicle_spawn", skip(client, rng, rig, shutdown), fields(role = ?role))]
    pub async fn spawn<C: SimClient, R: Rng>(
        client: &C,
        rng: &mut R,
        role: VehicleRole,
        rig: &RigSpec,
        tm_port: u16,
        shutdown: &AtomicBool,
    ) -> Result<Self> {
        let blueprint = match role {
            VehicleRole::Ego => EGO_BLUEPRINT.to_string(),
            VehicleRole::Traffic => {
                let library = client.vehicle_blueprints().await?;
                let candidates = traffic_candidates(&library);
                candidates
                    .choose(rng)
                    .map(|bp| bp.id.clone())
                    .ok_or_else(|| {
                        HarvestError::Other("no traffic body blueprints available".into())
                    })?
            }
        };

        let spawn_points = client.spawn_points().await?;
        let body =
            spawn_body_with_retry(client, rng, &blueprint, &spawn_points, shutdown).await?;

        client.set_autopilot(body, tm_port).await?;

        let mut cameras = Vec::new();
        if role == VehicleRole::Ego {
            for spec in rig.cameras() {
                let camera = Camera::attach(client, body, spec).await?;
                cameras.push((spec.name.clone(), camera));
            }
        }

        info!(body, blueprint = %blueprint, cameras = cameras.len(), "vehicle spawned");

        Ok(Self {
            role,
            blueprint,
            body: Some(body),
            cameras,
        })
    }

    pub fn is_ego(&self) -> bool {
        self.role == VehicleRole::Ego
    }

    pub fn blueprint(&self) -> &str {
        &self.blueprint
    }

    /// Body handle, `None` once destroyed
    pub fn body(&self) -> Option<ActorId> {
        self.body
    }

    /// Rig cameras in definition order
    pub fn cameras(&self) -> &[(String, Camera)] {
        &self.cameras
    }

    pub fn cameras_mut(&mut self) -> &mut [(String, Camera)] {
        &mut self.cameras
    }

    /// Tick every owned camera in rig order.
    ///
    /// No-op if the body was never spawned or has been destroyed.
    pub fn tick(&self) {
        if self.body.is_none() {
            return;
        }
        for (_, camera) in &self.cameras {
            camera.tick();
        }
    }

    /// Destroy all cameras, then the body.
    ///
    /// Idempotent; destroy failures are logged, never propagated, so episode
    /// teardown always runs to completion.
    #[instrument(name = "vehicle_destroy", skip(self, client), fields(role = ?self.role))]
    pub async fn destroy<C: SimClient>(&mut self, client: &C) {
        for (name, camera) in &mut self.cameras {
            debug!(camera = %name, "destroying rig camera");
            camera.destroy(client).await;
        }
        self.cameras.clear();

        if let Some(body) = self.body.take() {
            match client.actor_is_alive(body).await {
                Ok(true) => {
                    if let Err(e) = client.destroy_actor(body).await {
                        warn!(body, error = %e, "failed to destroy vehicle body");
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(body, error = %e, "could not query body liveness"),
            }
        }
    }
}

/// Retry placement over uniformly-random spawn points until the simulator
/// accepts one.
///
/// Occupied points are expected and retried; the cap turns a pathological
/// world into a typed [`HarvestError::SpawnExhausted`] instead of an infinite
/// loop. The cancellation flag is checked every attempt.
pub(crate) async fn spawn_body_with_retry<C: SimClient, R: Rng>(
    client: &C,
    rng: &mut R,
    blueprint: &str,
    spawn_points: &[Transform],
    shutdown: &AtomicBool,
) -> Result<ActorId> {
    if spawn_points.is_empty() {
        return Err(HarvestError::Other("world has no spawn points".into()));
    }

    for attempt in 1..=MAX_SPAWN_ATTEMPTS {
        if shutdown.load(Ordering::Relaxed) {
            return Err(HarvestError::Interrupted);
        }

        let point = spawn_points
            .choose(rng)
            .expect("spawn_points checked non-empty");

        if let Some(actor_id) = client.try_spawn_body(blueprint, point).await? {
            return Ok(actor_id);
        }

        debug!(blueprint, attempt, "spawn point occupied, retrying");
    }

    Err(HarvestError::spawn_exhausted(blueprint, MAX_SPAWN_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::{MockSimClient, MockSimConfig};
    use crate::rig::RigSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    async fn connected_client(config: MockSimConfig) -> MockSimClient {
        let mut client = MockSimClient::with_config(config);
        client
            .connect("localhost", 2000, Duration::from_secs(5))
            .await
            .unwrap();
        client.load_world("Town01").await.unwrap();
        client
    }

    #[tokio::test]
    async fn ego_vehicle_carries_full_rig() {
        let client = connected_client(MockSimConfig::default()).await;
        let mut rng = StdRng::seed_from_u64(7);
        let shutdown = AtomicBool::new(false);

        let vehicle = Vehicle::spawn(
            &client,
            &mut rng,
            VehicleRole::Ego,
            &RigSpec::ego_default(),
            8000,
            &shutdown,
        )
        .await
        .unwrap();

        assert!(vehicle.is_ego());
        assert_eq!(vehicle.cameras().len(), 7);
        assert_eq!(vehicle.blueprint(), EGO_BLUEPRINT);
    }

    #[tokio::test]
    async fn traffic_vehicle_has_no_sensors() {
        let client = connected_client(MockSimConfig::default()).await;
        let mut rng = StdRng::seed_from_u64(7);
        let shutdown = AtomicBool::new(false);

        let vehicle = Vehicle::spawn(
            &client,
            &mut rng,
            VehicleRole::Traffic,
            &RigSpec::ego_default(),
            8000,
            &shutdown,
        )
        .await
        .unwrap();

        assert!(!vehicle.is_ego());
        assert!(vehicle.cameras().is_empty());
    }

    #[tokio::test]
    async fn spawn_retries_past_occupied_points() {
        let client = connected_client(MockSimConfig {
            occupied_attempts: 3,
            ..Default::default()
        })
        .await;
        let mut rng = StdRng::seed_from_u64(7);
        let shutdown = AtomicBool::new(false);

        let vehicle = Vehicle::spawn(
            &client,
            &mut rng,
            VehicleRole::Traffic,
            &RigSpec::ego_default(),
            8000,
            &shutdown,
        )
        .await
        .unwrap();
        assert!(vehicle.body().is_some());
    }

    #[tokio::test]
    async fn spawn_exhaustion_is_typed() {
        let client = connected_client(MockSimConfig {
            occupied_attempts: u32::MAX,
            ..Default::default()
        })
        .await;
        let mut rng = StdRng::seed_from_u64(7);
        let shutdown = AtomicBool::new(false);

        let err = Vehicle::spawn(
            &client,
            &mut rng,
            VehicleRole::Traffic,
            &RigSpec::ego_default(),
            8000,
            &shutdown,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HarvestError::SpawnExhausted { attempts, .. }
            if attempts == MAX_SPAWN_ATTEMPTS));
    }

    #[tokio::test]
    async fn shutdown_flag_aborts_retry_loop() {
        let client = connected_client(MockSimConfig {
            occupied_attempts: u32::MAX,
            ..Default::default()
        })
        .await;
        let mut rng = StdRng::seed_from_u64(7);
        let shutdown = AtomicBool::new(true);

        let err = Vehicle::spawn(
            &client,
            &mut rng,
            VehicleRole::Ego,
            &RigSpec::ego_default(),
            8000,
            &shutdown,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HarvestError::Interrupted));
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let client = connected_client(MockSimConfig::default()).await;
        let mut rng = StdRng::seed_from_u64(7);
        let shutdown = AtomicBool::new(false);

        let mut vehicle = Vehicle::spawn(
            &client,
            &mut rng,
            VehicleRole::Ego,
            &RigSpec::ego_default(),
            8000,
            &shutdown,
        )
        .await
        .unwrap();

        vehicle.destroy(&client).await;
        assert!(vehicle.body().is_none());
        assert!(vehicle.cameras().is_empty());
        assert_eq!(client.actor_count(), 0);

        // Second destroy must not fail or release anything twice
        vehicle.destroy(&client).await;
        assert_eq!(client.actor_count(), 0);
    }
}
