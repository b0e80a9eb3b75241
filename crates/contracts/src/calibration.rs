//! Calibration metadata schema persisted as `agents/<index>/sensors.json`.
//!
//! Written once per episode-agent and immutable thereafter: mount transforms
//! are fixed at rig-definition time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CaptureOptions, Transform};

/// Mount transform in the persisted layout: `location [x, y, z]`,
/// `rotation [yaw, pitch, roll]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MountTransform {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
}

impl From<Transform> for MountTransform {
    fn from(transform: Transform) -> Self {
        Self {
            location: [
                transform.location.x,
                transform.location.y,
                transform.location.z,
            ],
            rotation: [
                transform.rotation.yaw,
                transform.rotation.pitch,
                transform.rotation.roll,
            ],
        }
    }
}

/// Per-sensor calibration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCalibration {
    /// Simulator blueprint identifier, e.g. "sensor.camera.rgb"
    pub sensor_type: String,

    pub sensor_options: CaptureOptions,

    /// Derived 3×3 intrinsic matrix, row major
    pub intrinsic: [[f64; 3]; 3],

    pub transform: MountTransform,

    /// Derived 4×4 homogeneous extrinsic matrix, row major
    pub extrinsic: [[f64; 4]; 4],
}

/// Top-level `sensors.json` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigCalibrationFile {
    pub sensors: BTreeMap<String, SensorCalibration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Location, Rotation};

    #[test]
    fn mount_transform_reorders_rotation_as_yaw_pitch_roll() {
        let transform = Transform {
            location: Location::new(1.0, 2.0, 3.0),
            rotation: Rotation {
                pitch: -90.0,
                yaw: 180.0,
                roll: 5.0,
            },
        };
        let mount = MountTransform::from(transform);
        assert_eq!(mount.location, [1.0, 2.0, 3.0]);
        assert_eq!(mount.rotation, [180.0, -90.0, 5.0]);
    }

    #[test]
    fn sensors_file_schema_shape() {
        let mut file = RigCalibrationFile::default();
        file.sensors.insert(
            "front_camera".into(),
            SensorCalibration {
                sensor_type: "sensor.camera.rgb".into(),
                sensor_options: CaptureOptions {
                    image_size_x: 352,
                    image_size_y: 128,
                    fov: 90.0,
                },
                intrinsic: [[176.0, 0.0, 176.0], [0.0, 176.0, 64.0], [0.0, 0.0, 1.0]],
                transform: MountTransform {
                    location: [0.0, 0.0, 2.4],
                    rotation: [0.0, 0.0, 0.0],
                },
                extrinsic: [
                    [1.0, 0.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0, 0.0],
                    [0.0, 0.0, 1.0, 2.4],
                    [0.0, 0.0, 0.0, 1.0],
                ],
            },
        );

        let json = serde_json::to_value(&file).unwrap();
        let entry = &json["sensors"]["front_camera"];
        assert_eq!(entry["sensor_type"], "sensor.camera.rgb");
        assert_eq!(entry["sensor_options"]["image_size_x"], 352);
        assert_eq!(entry["transform"]["rotation"][0], 0.0);
        assert_eq!(entry["intrinsic"][0][0], 176.0);
        assert_eq!(entry["extrinsic"][3][3], 1.0);
    }
}
