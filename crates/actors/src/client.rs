//! Simulator client abstraction
//!
//! Defines the capability trait for interacting with the simulator, supporting
//! the real implementation and mock testing.

use std::future::Future;
use std::time::Duration;

use contracts::{
    ActorId, BodyBlueprint, CameraKind, CaptureOptions, FrameStream, Location, MapLayer, Result,
    Transform, WeatherPreset,
};

/// Simulator client trait
///
/// Abstracts the simulator's core operations so the orchestration and actor
/// layers run unchanged against the real CARLA binding or the mock client.
///
/// Exactly one client instance is owned per orchestrator; `load_world`
/// replaces the world wholesale and invalidates every actor handle obtained
/// before the call.
pub trait SimClient: Send + Sync {
    /// Connect to the simulator server
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Load a world map, discarding the previous one
    ///
    /// All previously held actor and sensor handles become invalid.
    fn load_world(&self, map: &str) -> impl Future<Output = Result<()>> + Send;

    /// Enable synchronous fixed-timestep stepping
    ///
    /// Mandatory for deterministic frame alignment: a confirmed step implies
    /// all sensor captures for that step were delivered.
    fn configure_sync_stepping(
        &self,
        fixed_delta_seconds: f64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Disable a cosmetic map layer
    fn unload_layer(&self, layer: MapLayer) -> impl Future<Output = Result<()>> + Send;

    /// Apply a weather preset to the loaded world
    fn set_weather(&self, preset: WeatherPreset) -> impl Future<Output = Result<()>> + Send;

    /// Advance the world one step, blocking until the simulator confirms it
    fn tick(&self) -> impl Future<Output = Result<()>> + Send;

    /// Predefined spawn points of the loaded map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Vehicle body blueprints available in the loaded world
    fn vehicle_blueprints(&self) -> impl Future<Output = Result<Vec<BodyBlueprint>>> + Send;

    /// Attempt to place a body at a spawn point
    ///
    /// Returns `Ok(None)` when the point is occupied — an expected, retryable
    /// condition. Errors are reserved for fatal simulator failures.
    fn try_spawn_body(
        &self,
        blueprint: &str,
        at: &Transform,
    ) -> impl Future<Output = Result<Option<ActorId>>> + Send;

    /// Spawn a camera attached to a parent body
    fn spawn_camera(
        &self,
        kind: CameraKind,
        mount: &Transform,
        parent: ActorId,
        options: &CaptureOptions,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Delegate a body to the traffic-coordination service
    fn set_autopilot(
        &self,
        actor_id: ActorId,
        tm_port: u16,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Destroy an actor
    ///
    /// Idempotent operation: returns Ok if the actor no longer exists.
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check whether an actor handle is still live
    fn actor_is_alive(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Current world location of an actor
    fn actor_location(&self, actor_id: ActorId) -> impl Future<Output = Result<Location>> + Send;

    /// Frame delivery stream of a spawned camera
    ///
    /// Returns `None` if the actor is unknown or is not a camera. This is the
    /// core interface unifying mock and real sensor delivery.
    fn frame_stream(&self, actor_id: ActorId) -> Option<Box<dyn FrameStream>>;
}
