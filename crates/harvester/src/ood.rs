//! Out-of-distribution actor population.
//!
//! OOD actors (animals and similar anomaly bodies) are placed away from
//! traffic during population and evicted whenever a vehicle gets too close,
//! with an immediate respawn elsewhere under the same placement policy. The
//! registry is mutated only by the orchestrator's control thread.

use std::sync::atomic::{AtomicBool, Ordering};

use actors::SimClient;
use contracts::{ActorId, HarvestError, Location, Result, Transform};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

/// OOD actors placed per episode
pub const OOD_TARGET_COUNT: usize = 40;

/// Placement attempts per actor before accepting fewer
pub const OOD_PLACEMENT_ATTEMPTS: u32 = 30;

/// Minimum distance to any existing OOD actor or vehicle at placement
pub const OOD_MIN_SEPARATION: f64 = 5.0;

/// Distance to a vehicle below which an OOD actor is evicted and respawned
pub const OOD_PROXIMITY_LIMIT: f64 = 3.0;

struct OodActor {
    id: ActorId,
    class: String,
}

/// Live OOD population of one episode
#[derive(Default)]
pub struct OodRegistry {
    classes: Vec<String>,
    actors: Vec<OodActor>,
}

impl OodRegistry {
    /// Registry that never spawns anything
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            actors: Vec::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.classes.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.actors.len()
    }

    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.iter().map(|actor| actor.id).collect()
    }

    /// Place up to [`OOD_TARGET_COUNT`] actors, each at least
    /// [`OOD_MIN_SEPARATION`] away from every vehicle and every other OOD
    /// actor. Exhausting the attempt cap is non-fatal: the episode proceeds
    /// with fewer actors.
    #[instrument(name = "ood_populate", skip_all, fields(classes = self.classes.len()))]
    pub async fn populate<C: SimClient, R: Rng>(
        &mut self,
        client: &C,
        rng: &mut R,
        spawn_points: &[Transform],
        vehicles: &[ActorId],
        shutdown: &AtomicBool,
    ) -> Result<usize> {
        if !self.enabled() {
            return Ok(0);
        }

        let vehicle_locations = locations_of(client, vehicles).await?;

        let mut placed = 0;
        for _ in 0..OOD_TARGET_COUNT {
            if shutdown.load(Ordering::Relaxed) {
                return Err(HarvestError::Interrupted);
            }

            match self
                .place_one(client, rng, spawn_points, &vehicle_locations, shutdown)
                .await?
            {
                Some(_) => placed += 1,
                None => {
                    debug!(placed, "ood placement exhausted, accepting fewer actors");
                    break;
                }
            }
        }

        info!(placed, target = OOD_TARGET_COUNT, "ood population complete");
        Ok(placed)
    }

    /// Evict every OOD actor within [`OOD_PROXIMITY_LIMIT`] of a vehicle and
    /// respawn it elsewhere. The live count never increases: each eviction
    /// removes one actor and adds at most one.
    ///
    /// Returns the number of respawns performed.
    pub async fn enforce_separation<C: SimClient, R: Rng>(
        &mut self,
        client: &C,
        rng: &mut R,
        spawn_points: &[Transform],
        vehicles: &[ActorId],
        shutdown: &AtomicBool,
    ) -> Result<usize> {
        if self.actors.is_empty() {
            return Ok(0);
        }

        let vehicle_locations = locations_of(client, vehicles).await?;

        let mut respawns = 0;
        let mut index = 0;
        while index < self.actors.len() {
            let actor_id = self.actors[index].id;
            let location = match client.actor_location(actor_id).await {
                Ok(location) => location,
                Err(HarvestError::ActorNotFound { .. }) => {
                    // Died outside our control; drop it from the registry
                    warn!(actor_id, "ood actor vanished, dropping from registry");
                    self.actors.remove(index);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let violating = vehicle_locations
                .iter()
                .any(|vehicle| vehicle.distance(&location) < OOD_PROXIMITY_LIMIT);
            if !violating {
                index += 1;
                continue;
            }

            debug!(actor_id, "ood actor too close to traffic, evicting");
            client.destroy_actor(actor_id).await?;
            self.actors.remove(index);

            if let Some(new_id) = self
                .place_one(client, rng, spawn_points, &vehicle_locations, shutdown)
                .await?
            {
                debug!(new_id, "ood actor respawned");
                respawns += 1;
            }
        }

        Ok(respawns)
    }

    /// Destroy every live OOD actor; failures are logged, never propagated
    pub async fn destroy_all<C: SimClient>(&mut self, client: &C) {
        for actor in self.actors.drain(..) {
            if let Err(e) = client.destroy_actor(actor.id).await {
                warn!(actor_id = actor.id, class = %actor.class, error = %e, "failed to destroy ood actor");
            }
        }
    }

    async fn place_one<C: SimClient, R: Rng>(
        &mut self,
        client: &C,
        rng: &mut R,
        spawn_points: &[Transform],
        vehicle_locations: &[Location],
        shutdown: &AtomicBool,
    ) -> Result<Option<ActorId>> {
        if spawn_points.is_empty() {
            return Ok(None);
        }

        let existing = locations_of(client, &self.actor_ids()).await?;

        for _attempt in 1..=OOD_PLACEMENT_ATTEMPTS {
            if shutdown.load(Ordering::Relaxed) {
                return Err(HarvestError::Interrupted);
            }

            let point = spawn_points
                .choose(rng)
                .expect("spawn_points checked non-empty");

            let too_close = vehicle_locations
                .iter()
                .chain(existing.iter())
                .any(|other| other.distance(&point.location) < OOD_MIN_SEPARATION);
            if too_close {
                continue;
            }

            let class = self
                .classes
                .choose(rng)
                .expect("populate requires non-empty classes")
                .clone();

            if let Some(actor_id) = client.try_spawn_body(&class, point).await? {
                self.actors.push(OodActor {
                    id: actor_id,
                    class,
                });
                return Ok(Some(actor_id));
            }
        }

        Ok(None)
    }
}

async fn locations_of<C: SimClient>(client: &C, actors: &[ActorId]) -> Result<Vec<Location>> {
    let mut locations = Vec::with_capacity(actors.len());
    for &actor_id in actors {
        locations.push(client.actor_location(actor_id).await?);
    }
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actors::{MockSimClient, MockSimConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    async fn world_with_vehicle() -> (MockSimClient, ActorId) {
        let mut client = MockSimClient::with_config(MockSimConfig {
            spawn_points: 64,
            ..Default::default()
        });
        client
            .connect("localhost", 2000, Duration::from_secs(5))
            .await
            .unwrap();
        client.load_world("Town01").await.unwrap();
        let vehicle = client
            .try_spawn_body("vehicle.audi.tt", &Transform::at(0.0, 0.0, 0.3))
            .await
            .unwrap()
            .unwrap();
        (client, vehicle)
    }

    fn registry() -> OodRegistry {
        OodRegistry::new(vec!["walker.animal.deer".into(), "walker.animal.boar".into()])
    }

    #[tokio::test]
    async fn populates_up_to_target_with_separation() {
        let (client, vehicle) = world_with_vehicle().await;
        let mut rng = StdRng::seed_from_u64(11);
        let shutdown = AtomicBool::new(false);

        let mut ood = registry();
        let placed = ood
            .populate(&client, &mut rng, &client.spawn_points().await.unwrap(), &[vehicle], &shutdown)
            .await
            .unwrap();

        assert!(placed > 0);
        assert!(placed <= OOD_TARGET_COUNT);
        assert_eq!(ood.live_count(), placed);

        // Nothing placed within the separation radius of the vehicle
        let vehicle_location = client.actor_location(vehicle).await.unwrap();
        for actor_id in ood.actor_ids() {
            let location = client.actor_location(actor_id).await.unwrap();
            assert!(vehicle_location.distance(&location) >= OOD_MIN_SEPARATION);
        }
    }

    #[tokio::test]
    async fn eviction_never_increases_live_count() {
        let (client, vehicle) = world_with_vehicle().await;
        let mut rng = StdRng::seed_from_u64(11);
        let shutdown = AtomicBool::new(false);
        let spawn_points = client.spawn_points().await.unwrap();

        let mut ood = registry();
        ood.populate(&client, &mut rng, &spawn_points, &[vehicle], &shutdown)
            .await
            .unwrap();
        let before = ood.live_count();
        assert!(before > 0);

        // Drive the vehicle on top of one OOD actor
        let victim = ood.actor_ids()[0];
        let victim_location = client.actor_location(victim).await.unwrap();
        client.set_actor_location(vehicle, victim_location);

        ood.enforce_separation(&client, &mut rng, &spawn_points, &[vehicle], &shutdown)
            .await
            .unwrap();

        assert!(ood.live_count() <= before);
        // The victim itself is gone
        assert!(!ood.actor_ids().contains(&victim));
    }

    #[tokio::test]
    async fn destroy_all_clears_registry() {
        let (client, vehicle) = world_with_vehicle().await;
        let mut rng = StdRng::seed_from_u64(11);
        let shutdown = AtomicBool::new(false);

        let mut ood = registry();
        ood.populate(
            &client,
            &mut rng,
            &client.spawn_points().await.unwrap(),
            &[vehicle],
            &shutdown,
        )
        .await
        .unwrap();

        ood.destroy_all(&client).await;
        assert_eq!(ood.live_count(), 0);
        // Only the vehicle remains in the world
        assert_eq!(client.actor_count(), 1);
    }
}
