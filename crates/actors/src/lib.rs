//! # Actors
//!
//! Simulated actor lifecycle module.
//!
//! Responsibilities:
//! - Abstract the simulator behind the `SimClient` trait
//! - Spawn vehicles with bounded placement retry
//! - Attach and manage ego camera rigs
//! - Provide idempotent teardown without leaking native handles
//! - Support mock mode for development and tests
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod blueprint;
pub mod camera;
pub mod client;
pub mod mock_client;
pub mod rig;
pub mod vehicle;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_stream;

pub use blueprint::{ood_candidates, traffic_candidates, EGO_BLUEPRINT};
pub use camera::Camera;
pub use client::SimClient;
pub use contracts::{HarvestError, Result};
pub use mock_client::{MockSimClient, MockSimConfig};
pub use rig::{CameraSpec, RigSpec, REFERENCE_SENSOR};
pub use vehicle::{Vehicle, VehicleRole};

#[cfg(feature = "real-carla")]
pub use carla_client::RealSimClient;
