//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - The world advances in fixed-timestep synchronous steps; every step blocks
//!   until the simulator confirms completion
//! - Every 5th step is a capture tick; the global frame index advances once per
//!   capture tick, never per step

mod calibration;
mod camera;
mod config;
mod error;
mod frame_stream;
mod geometry;
mod world;

pub use calibration::*;
pub use camera::*;
pub use config::*;
pub use error::*;
pub use frame_stream::{FrameCallback, FrameStream};
pub use geometry::*;
pub use world::*;
