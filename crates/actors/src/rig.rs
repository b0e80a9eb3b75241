//! Ego camera-rig definitions.
//!
//! A rig is the fixed set of named, positioned cameras attached to an ego
//! body. Rig order is definition order; names are unique and become the
//! per-sensor directory names in the persisted dataset.

use contracts::{CameraKind, CaptureOptions, HarvestError, Result, Transform};

/// Sensor used to resume the frame index from an existing dataset
pub const REFERENCE_SENSOR: &str = "back_camera";

/// Ring camera mount height above the body origin
const RING_CAMERA_HEIGHT: f64 = 2.4;

/// Square ground footprint the top-down camera must cover, meters
const TOPDOWN_FOOTPRINT: f64 = 60.0;

const RING_OPTIONS: CaptureOptions = CaptureOptions {
    image_size_x: 352,
    image_size_y: 128,
    fov: 90.0,
};

const TOPDOWN_OPTIONS: CaptureOptions = CaptureOptions {
    image_size_x: 200,
    image_size_y: 200,
    fov: 90.0,
};

/// One camera slot in a rig
#[derive(Debug, Clone)]
pub struct CameraSpec {
    pub name: String,
    pub kind: CameraKind,
    pub mount: Transform,
    pub options: CaptureOptions,
}

impl CameraSpec {
    pub fn new(
        name: impl Into<String>,
        kind: CameraKind,
        mount: Transform,
        options: CaptureOptions,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            mount,
            options,
        }
    }
}

/// Ordered, uniquely-named camera set
#[derive(Debug, Clone)]
pub struct RigSpec {
    cameras: Vec<CameraSpec>,
}

impl RigSpec {
    /// Build a rig from camera specs, rejecting duplicate names
    pub fn new(cameras: Vec<CameraSpec>) -> Result<Self> {
        for (i, camera) in cameras.iter().enumerate() {
            if cameras[..i].iter().any(|other| other.name == camera.name) {
                return Err(HarvestError::config_validation(
                    format!("rig[{}]", camera.name),
                    "duplicate camera name in rig",
                ));
            }
        }
        Ok(Self { cameras })
    }

    /// The default ego rig: six yaw-rotated RGB ring cameras plus one
    /// top-down semantic-segmentation camera whose mount height makes its
    /// field of view cover [`TOPDOWN_FOOTPRINT`].
    pub fn ego_default() -> Self {
        let ring = [
            ("left_front_camera", -60.0),
            ("front_camera", 0.0),
            ("right_front_camera", 60.0),
            ("left_back_camera", -120.0),
            ("back_camera", 180.0),
            ("right_back_camera", 120.0),
        ];

        let mut cameras: Vec<CameraSpec> = ring
            .iter()
            .map(|(name, yaw)| {
                CameraSpec::new(
                    *name,
                    CameraKind::Rgb,
                    Transform::at(0.0, 0.0, RING_CAMERA_HEIGHT).with_yaw(*yaw),
                    RING_OPTIONS,
                )
            })
            .collect();

        let topdown_height =
            calibration::topdown_mount_height(TOPDOWN_FOOTPRINT, TOPDOWN_OPTIONS.fov);
        cameras.push(CameraSpec::new(
            "birds_view_semantic_camera",
            CameraKind::SemanticSegmentation,
            Transform::at(0.0, 0.0, topdown_height).with_pitch(-90.0),
            TOPDOWN_OPTIONS,
        ));

        Self { cameras }
    }

    pub fn cameras(&self) -> &[CameraSpec] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_has_seven_cameras_in_definition_order() {
        let rig = RigSpec::ego_default();
        let names: Vec<&str> = rig.cameras().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "left_front_camera",
                "front_camera",
                "right_front_camera",
                "left_back_camera",
                "back_camera",
                "right_back_camera",
                "birds_view_semantic_camera",
            ]
        );
        assert!(names.contains(&REFERENCE_SENSOR));
    }

    #[test]
    fn topdown_camera_height_covers_footprint() {
        let rig = RigSpec::ego_default();
        let topdown = rig.cameras().last().unwrap();
        assert_eq!(topdown.kind, CameraKind::SemanticSegmentation);
        assert_eq!(topdown.mount.rotation.pitch, -90.0);
        // footprint 60 at fov 90 puts the camera 30 units up
        assert!((topdown.mount.location.z - 30.0).abs() < 1e-9);
    }

    #[test]
    fn ring_cameras_are_rgb_at_mount_height() {
        let rig = RigSpec::ego_default();
        for camera in &rig.cameras()[..6] {
            assert_eq!(camera.kind, CameraKind::Rgb);
            assert_eq!(camera.mount.location.z, RING_CAMERA_HEIGHT);
            assert_eq!(camera.options.image_size_x, 352);
        }
    }

    #[test]
    fn duplicate_names_rejected() {
        let specs = vec![
            CameraSpec::new("cam", CameraKind::Rgb, Transform::default(), RING_OPTIONS),
            CameraSpec::new("cam", CameraKind::Depth, Transform::default(), RING_OPTIONS),
        ];
        assert!(RigSpec::new(specs).is_err());
    }
}
