//! Real CARLA client implementation
//!
//! Connects to a CARLA server using the carla-rust crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carla::client::{ActorBase, Client, Sensor, Vehicle, World};
use carla::geom::{Location as CarlaLocation, Rotation as CarlaRotation, Transform as CarlaTransform};
use carla::rpc::EpisodeSettings;
use contracts::{
    ActorId, BodyBlueprint, CameraKind, CaptureOptions, FrameStream, HarvestError, Location,
    MapLayer, Result, Transform, WeatherPreset,
};
use tracing::{debug, info, instrument, warn};

use crate::carla_stream::CarlaFrameStream;
use crate::client::SimClient;

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements the SimClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealSimClient {
    client: Arc<Mutex<Option<Client>>>,
    world: Arc<Mutex<Option<World>>>,
    /// Created actors registry (for liveness checks and teardown)
    actors: Arc<Mutex<HashMap<ActorId, ActorKind>>>,
}

#[derive(Clone)]
enum ActorKind {
    Body(carla::client::Actor),
    Camera { sensor: Sensor, kind: CameraKind },
}

impl RealSimClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut world_guard = self.world.lock().unwrap();
        let world = world_guard
            .as_mut()
            .ok_or_else(|| HarvestError::connection("not connected to CARLA server"))?;
        f(world)
    }

    fn store_actor(&self, actor_id: ActorId, actor: ActorKind) {
        self.actors.lock().unwrap().insert(actor_id, actor);
    }

    fn to_carla_transform(transform: &Transform) -> CarlaTransform {
        CarlaTransform {
            location: CarlaLocation {
                x: transform.location.x as f32,
                y: transform.location.y as f32,
                z: transform.location.z as f32,
            },
            rotation: CarlaRotation {
                pitch: transform.rotation.pitch as f32,
                yaw: transform.rotation.yaw as f32,
                roll: transform.rotation.roll as f32,
            },
        }
    }

    fn from_carla_transform(transform: &CarlaTransform) -> Transform {
        Transform {
            location: Location {
                x: transform.location.x as f64,
                y: transform.location.y as f64,
                z: transform.location.z as f64,
            },
            rotation: contracts::Rotation {
                pitch: transform.rotation.pitch as f64,
                yaw: transform.rotation.yaw as f64,
                roll: transform.rotation.roll as f64,
            },
        }
    }
}

fn to_carla_layer(layer: MapLayer) -> carla::rpc::MapLayer {
    match layer {
        MapLayer::Foliage => carla::rpc::MapLayer::Foliage,
        MapLayer::ParkedVehicles => carla::rpc::MapLayer::ParkedVehicles,
    }
}

/// Preset parameters: (cloudiness, precipitation, wetness, sun altitude)
fn preset_params(preset: WeatherPreset) -> (f32, f32, f32, f32) {
    use WeatherPreset::*;
    match preset {
        Default => (5.0, 0.0, 0.0, 45.0),
        ClearNoon => (15.0, 0.0, 0.0, 75.0),
        CloudyNoon => (80.0, 0.0, 0.0, 75.0),
        WetNoon => (20.0, 0.0, 50.0, 75.0),
        WetCloudyNoon => (80.0, 0.0, 50.0, 75.0),
        MidRainyNoon => (80.0, 30.0, 50.0, 75.0),
        HardRainNoon => (90.0, 60.0, 100.0, 75.0),
        SoftRainNoon => (70.0, 15.0, 50.0, 75.0),
        ClearSunset => (15.0, 0.0, 0.0, 15.0),
        CloudySunset => (80.0, 0.0, 0.0, 15.0),
        WetSunset => (20.0, 0.0, 50.0, 15.0),
        WetCloudySunset => (80.0, 0.0, 50.0, 15.0),
        MidRainSunset => (80.0, 30.0, 50.0, 15.0),
        HardRainSunset => (90.0, 60.0, 100.0, 15.0),
        SoftRainSunset => (70.0, 15.0, 50.0, 15.0),
    }
}

impl SimClient for RealSimClient {
    #[instrument(name = "real_sim_connect", skip(self, _timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        // TODO: plumb the timeout through once carla-rust exposes
        // Client::set_timeout
        let client = Client::connect(host, port, None);
        let world = client.world();

        info!(map = %world.map().name(), "connected to CARLA server");

        *self.client.lock().unwrap() = Some(client);
        *self.world.lock().unwrap() = Some(world);

        Ok(())
    }

    #[instrument(name = "real_sim_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        let client_guard = self.client.lock().unwrap();
        let client = client_guard
            .as_ref()
            .ok_or_else(|| HarvestError::connection("not connected to CARLA server"))?;

        let world = client.load_world(map);

        // All handles from the previous world are now stale
        self.actors.lock().unwrap().clear();
        *self.world.lock().unwrap() = Some(world);

        info!(map, "world reloaded");
        Ok(())
    }

    #[instrument(name = "real_sim_sync_stepping", skip(self))]
    async fn configure_sync_stepping(&self, fixed_delta_seconds: f64) -> Result<()> {
        self.with_world_mut(|world| {
            let settings = EpisodeSettings {
                synchronous_mode: true,
                fixed_delta_seconds: Some(fixed_delta_seconds),
                ..world.settings()
            };
            world.apply_settings(&settings, Duration::from_secs(10));
            Ok(())
        })
    }

    #[instrument(name = "real_sim_unload_layer", skip(self), fields(layer = ?layer))]
    async fn unload_layer(&self, layer: MapLayer) -> Result<()> {
        self.with_world_mut(|world| {
            world.unload_map_layer(to_carla_layer(layer));
            Ok(())
        })
    }

    #[instrument(name = "real_sim_set_weather", skip(self), fields(preset = ?preset))]
    async fn set_weather(&self, preset: WeatherPreset) -> Result<()> {
        let (cloudiness, precipitation, wetness, sun_altitude_angle) = preset_params(preset);
        self.with_world_mut(|world| {
            let weather = carla::rpc::WeatherParameters {
                cloudiness,
                precipitation,
                wetness,
                sun_altitude_angle,
                ..Default::default()
            };
            world.set_weather(&weather);
            Ok(())
        })
    }

    async fn tick(&self) -> Result<()> {
        self.with_world_mut(|world| {
            world.tick();
            Ok(())
        })
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            let points = world.map().recommended_spawn_points();
            let mut out = Vec::new();
            let mut i = 0;
            while let Some(point) = points.get(i) {
                out.push(Self::from_carla_transform(&point));
                i += 1;
            }
            Ok(out)
        })
    }

    async fn vehicle_blueprints(&self) -> Result<Vec<BodyBlueprint>> {
        self.with_world_mut(|world| {
            let library = world.blueprint_library();
            let vehicles = library.filter("vehicle.*");
            let mut out = Vec::new();
            let mut i = 0;
            while let Some(blueprint) = vehicles.get(i) {
                let wheels = blueprint
                    .attribute("number_of_wheels")
                    .map(|attr| attr.value_string().parse::<u32>().unwrap_or(0))
                    .unwrap_or(0);
                out.push(BodyBlueprint::new(blueprint.id(), wheels));
                i += 1;
            }
            Ok(out)
        })
    }

    #[instrument(name = "real_sim_try_spawn_body", skip(self, at), fields(blueprint = %blueprint))]
    async fn try_spawn_body(&self, blueprint: &str, at: &Transform) -> Result<Option<ActorId>> {
        let spawned = self.with_world_mut(|world| {
            let library = world.blueprint_library();
            let bp = library.find(blueprint).ok_or_else(|| {
                HarvestError::Other(format!("blueprint '{blueprint}' not found"))
            })?;

            let transform = Self::to_carla_transform(at);
            // Spawn collisions are the expected transient case: report the
            // point as occupied rather than failing the episode.
            Ok(world.spawn_actor(&bp, &transform).ok())
        })?;

        match spawned {
            Some(actor) => {
                let actor_id = actor.id();
                debug!(actor_id, blueprint, "body spawned");
                self.store_actor(actor_id, ActorKind::Body(actor));
                Ok(Some(actor_id))
            }
            None => Ok(None),
        }
    }

    #[instrument(
        name = "real_sim_spawn_camera",
        skip(self, mount, options),
        fields(kind = ?kind, parent)
    )]
    async fn spawn_camera(
        &self,
        kind: CameraKind,
        mount: &Transform,
        parent: ActorId,
        options: &CaptureOptions,
    ) -> Result<ActorId> {
        let parent_actor = {
            let actors = self.actors.lock().unwrap();
            match actors.get(&parent) {
                Some(ActorKind::Body(actor)) => actor.clone(),
                _ => return Err(HarvestError::ActorNotFound { actor_id: parent }),
            }
        };

        let sensor = self.with_world_mut(|world| {
            let library = world.blueprint_library();
            let mut bp = library.find(kind.blueprint_id()).ok_or_else(|| {
                HarvestError::Other(format!("blueprint '{}' not found", kind.blueprint_id()))
            })?;

            for (key, value) in [
                ("image_size_x", options.image_size_x.to_string()),
                ("image_size_y", options.image_size_y.to_string()),
                ("fov", options.fov.to_string()),
            ] {
                if !bp.set_attribute(key, &value) {
                    warn!(key, value, "failed to set camera attribute");
                }
            }

            let transform = Self::to_carla_transform(mount);
            let actor = world
                .spawn_actor_attached(&bp, &transform, &parent_actor, None)
                .map_err(|e| HarvestError::Other(format!("camera spawn failed: {e}")))?;

            Sensor::try_from(actor)
                .map_err(|_| HarvestError::Other("spawned actor is not a sensor".to_string()))
        })?;

        let actor_id = sensor.id();
        debug!(actor_id, parent, "camera spawned and attached");
        self.store_actor(actor_id, ActorKind::Camera { sensor, kind });

        Ok(actor_id)
    }

    #[instrument(name = "real_sim_set_autopilot", skip(self), fields(actor_id, tm_port))]
    async fn set_autopilot(&self, actor_id: ActorId, tm_port: u16) -> Result<()> {
        let actor = {
            let actors = self.actors.lock().unwrap();
            match actors.get(&actor_id) {
                Some(ActorKind::Body(actor)) => actor.clone(),
                _ => return Err(HarvestError::ActorNotFound { actor_id }),
            }
        };

        // TODO: pass tm_port once carla-rust exposes the traffic-manager
        // overload of set_autopilot
        let _ = tm_port;
        match Vehicle::try_from(actor) {
            Ok(vehicle) => {
                vehicle.set_autopilot(true);
                Ok(())
            }
            // Non-vehicle bodies (OOD walkers/props) have no autopilot
            Err(_) => Ok(()),
        }
    }

    #[instrument(name = "real_sim_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let removed = self.actors.lock().unwrap().remove(&actor_id);

        if let Some(actor) = removed {
            match actor {
                ActorKind::Camera { sensor, .. } => {
                    if sensor.is_listening() {
                        sensor.stop();
                    }
                    if !sensor.destroy() {
                        warn!(actor_id, "destroy camera returned false");
                    }
                }
                ActorKind::Body(body) => {
                    if !body.destroy() {
                        warn!(actor_id, "destroy body returned false");
                    }
                }
            }
            debug!(actor_id, "actor destroyed");
        }

        // Idempotent: return Ok even if not present
        Ok(())
    }

    async fn actor_is_alive(&self, actor_id: ActorId) -> Result<bool> {
        let actors = self.actors.lock().unwrap();
        Ok(match actors.get(&actor_id) {
            Some(ActorKind::Body(actor)) => actor.is_alive(),
            Some(ActorKind::Camera { sensor, .. }) => sensor.is_alive(),
            None => false,
        })
    }

    async fn actor_location(&self, actor_id: ActorId) -> Result<Location> {
        let actors = self.actors.lock().unwrap();
        let location = match actors.get(&actor_id) {
            Some(ActorKind::Body(actor)) => actor.location(),
            Some(ActorKind::Camera { sensor, .. }) => sensor.location(),
            None => return Err(HarvestError::ActorNotFound { actor_id }),
        };
        Ok(Location {
            x: location.x as f64,
            y: location.y as f64,
            z: location.z as f64,
        })
    }

    fn frame_stream(&self, actor_id: ActorId) -> Option<Box<dyn FrameStream>> {
        let actors = self.actors.lock().unwrap();
        match actors.get(&actor_id) {
            Some(ActorKind::Camera { sensor, kind }) => {
                Some(Box::new(CarlaFrameStream::new(*kind, sensor.clone())))
            }
            _ => None,
        }
    }
}
