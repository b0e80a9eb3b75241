//! CARLA camera FrameStream wrapper
//!
//! Wraps a CARLA native `Sensor` as a type implementing the `FrameStream`
//! trait, applying the kind's color transform before delivery so every
//! consumer sees the same 4-channel visualized buffer regardless of camera
//! kind. Only compiled when the `real-carla` feature is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use carla::sensor::data::Image;
use contracts::{CameraKind, FrameCallback, FrameStream, RawImage};
use tracing::{debug, trace, warn};

/// CARLA camera wrapper
pub struct CarlaFrameStream {
    kind: CameraKind,
    sensor: carla::client::Sensor,
    listening: Arc<AtomicBool>,
}

impl CarlaFrameStream {
    pub fn new(kind: CameraKind, sensor: carla::client::Sensor) -> Self {
        Self {
            kind,
            sensor,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FrameStream for CarlaFrameStream {
    fn kind(&self) -> CameraKind {
        self.kind
    }

    fn listen(&self, callback: FrameCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!(kind = ?self.kind, "camera stream already listening");
            return;
        }

        let kind = self.kind;
        let listening = self.listening.clone();

        debug!(kind = ?kind, "starting CARLA camera stream");

        self.sensor.listen(move |sensor_data| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            match Image::try_from(sensor_data) {
                Ok(image) => {
                    let raw = visualize(kind, &image);
                    trace!(kind = ?kind, width = raw.width, "camera frame received");
                    callback(raw);
                }
                Err(_) => {
                    trace!(kind = ?kind, "non-image sensor data ignored");
                }
            }
        });
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(kind = ?self.kind, "stopping CARLA camera stream");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

/// Apply the kind's color transform to a raw camera image, producing the
/// 4-channel BGRA buffer the sensor layer decodes.
fn visualize(kind: CameraKind, image: &Image) -> RawImage {
    let width = image.width() as u32;
    let height = image.height() as u32;
    let bgra = image.as_raw_bytes();

    let data = match kind {
        CameraKind::Rgb => Bytes::copy_from_slice(bgra),
        CameraKind::Depth => logarithmic_depth(bgra),
        CameraKind::SemanticSegmentation => semantic_palette(bgra),
    };

    RawImage {
        width,
        height,
        data,
    }
}

/// Logarithmic grayscale depth visualization.
///
/// The encoded depth is `(R + G·256 + B·256²) / (256³ − 1)`; grayscale is
/// `saturate(1 + ln(normalized) / 5.70378)`, the simulator's logarithmic
/// converter constant.
fn logarithmic_depth(bgra: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(bgra.len());
    for pixel in bgra.chunks_exact(4) {
        let (b, g, r) = (pixel[0] as f64, pixel[1] as f64, pixel[2] as f64);
        let normalized = (r + g * 256.0 + b * 65536.0) / 16_777_215.0;
        let gray = if normalized > 0.0 {
            (1.0 + normalized.ln() / 5.70378).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let value = (gray * 255.0) as u8;
        out.extend_from_slice(&[value, value, value, 255]);
    }
    Bytes::from(out)
}

/// Fixed palette for semantic tags, indexed by the tag stored in the red
/// channel of the raw segmentation image. Colors are BGRA.
const SEMANTIC_PALETTE: [[u8; 3]; 23] = [
    [0, 0, 0],       // unlabeled
    [70, 70, 70],    // building
    [40, 40, 100],   // fence
    [80, 90, 55],    // other
    [60, 20, 220],   // pedestrian
    [153, 153, 153], // pole
    [50, 234, 157],  // road line
    [128, 64, 128],  // road
    [232, 35, 244],  // sidewalk
    [35, 142, 107],  // vegetation
    [142, 0, 0],     // vehicle
    [156, 102, 102], // wall
    [0, 220, 220],   // traffic sign
    [180, 130, 70],  // sky
    [81, 0, 81],     // ground
    [100, 100, 150], // bridge
    [140, 150, 230], // rail track
    [180, 165, 180], // guard rail
    [30, 170, 250],  // traffic light
    [160, 190, 110], // static
    [50, 120, 170],  // dynamic
    [150, 60, 45],   // water
    [100, 170, 145], // terrain
];

fn semantic_palette(bgra: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(bgra.len());
    for pixel in bgra.chunks_exact(4) {
        let tag = pixel[2] as usize;
        let color = SEMANTIC_PALETTE
            .get(tag)
            .copied()
            .unwrap_or(SEMANTIC_PALETTE[0]);
        out.extend_from_slice(&[color[0], color[1], color[2], 255]);
    }
    Bytes::from(out)
}
