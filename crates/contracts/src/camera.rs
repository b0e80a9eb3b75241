//! Camera kinds, capture options and frame payloads.
//!
//! Frames travel as raw 4-channel buffers from the simulator (the kind's color
//! transform already applied on the simulator side) and as decoded 3-channel
//! RGB buffers everywhere past the sensor boundary.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Camera variant attached to an ego rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    Rgb,
    Depth,
    SemanticSegmentation,
}

impl CameraKind {
    /// Simulator blueprint identifier, also the `sensor_type` string persisted
    /// in `sensors.json`
    pub fn blueprint_id(&self) -> &'static str {
        match self {
            CameraKind::Rgb => "sensor.camera.rgb",
            CameraKind::Depth => "sensor.camera.depth",
            CameraKind::SemanticSegmentation => "sensor.camera.semantic_segmentation",
        }
    }
}

/// Capture options of one camera, persisted verbatim as `sensor_options`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Image width in pixels
    pub image_size_x: u32,

    /// Image height in pixels
    pub image_size_y: u32,

    /// Horizontal field of view, degrees, must lie in (0, 180)
    pub fov: f64,
}

/// Raw 4-channel (BGRA) image as delivered by the simulator stream
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,

    /// BGRA8 pixel data, `height * width * 4` bytes
    pub data: Bytes,
}

/// Decoded 3-channel RGB frame
///
/// `data` is always exactly `height * width * 3` bytes; a freshly created
/// sensor exposes a zero-filled frame until the first delivery arrives.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,

    /// RGB8 pixel data
    pub data: Bytes,
}

impl CameraFrame {
    /// Zero-filled frame matching the capture resolution
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: Bytes::from(vec![0u8; (width * height * 3) as usize]),
        }
    }
}
