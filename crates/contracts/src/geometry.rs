//! 3D transforms shared between rig definitions and the simulator client.

use serde::{Deserialize, Serialize};

/// 3D transform: position + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position (x, y, z), meters
    pub location: Location,

    /// Rotation (pitch, yaw, roll), degrees
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another location
    pub fn distance(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Transform {
    /// Transform at a location with zero rotation
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            location: Location::new(x, y, z),
            rotation: Rotation::default(),
        }
    }

    /// Transform with a yaw rotation only, used by the lateral rig cameras
    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.rotation.yaw = yaw;
        self
    }

    /// Transform with a pitch rotation only, used by the top-down camera
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.rotation.pitch = pitch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Location::new(0.0, 0.0, 0.0);
        let b = Location::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn builders_compose() {
        let t = Transform::at(0.0, 0.0, 2.4).with_yaw(-60.0);
        assert_eq!(t.location.z, 2.4);
        assert_eq!(t.rotation.yaw, -60.0);
        assert_eq!(t.rotation.pitch, 0.0);
    }
}
