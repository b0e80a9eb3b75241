//! # Calibration
//!
//! Pure camera-calibration math: pinhole intrinsics from capture options,
//! homogeneous extrinsics from mount transforms, and rig-geometry helpers.
//!
//! No state, no simulator access; everything here is deterministic so the
//! persisted `sensors.json` matrices are reproducible bit-for-bit.

use contracts::{CameraKind, CaptureOptions, MountTransform, SensorCalibration, Transform};
use nalgebra::{Matrix3, Matrix4, Rotation3};

/// Pinhole intrinsic matrix from capture options.
///
/// Principal point at (width/2, height/2); focal length
/// `width / (2·tan(fov·π/360))` on both axes. `fov` must lie in (0, 180) —
/// the focal length diverges at 180.
pub fn intrinsic_matrix(options: &CaptureOptions) -> Matrix3<f64> {
    let width = options.image_size_x as f64;
    let height = options.image_size_y as f64;
    let focal = width / (2.0 * (options.fov * std::f64::consts::PI / 360.0).tan());

    let mut intrinsic = Matrix3::identity();
    intrinsic[(0, 0)] = focal;
    intrinsic[(1, 1)] = focal;
    intrinsic[(0, 2)] = width / 2.0;
    intrinsic[(1, 2)] = height / 2.0;
    intrinsic
}

/// Homogeneous 4×4 extrinsic matrix from a mount transform.
///
/// Rotation is composed yaw→pitch→roll, with roll negated before conversion
/// (left-handed mount convention). Translation sits in the last column,
/// bottom row [0, 0, 0, 1]. Downstream consumers depend on this exact
/// composition order and sign; do not change it.
pub fn extrinsic_matrix(transform: &Transform) -> Matrix4<f64> {
    let rotation = Rotation3::from_euler_angles(
        (-transform.rotation.roll).to_radians(),
        transform.rotation.pitch.to_radians(),
        transform.rotation.yaw.to_radians(),
    );

    let mut extrinsic = rotation.to_homogeneous();
    extrinsic[(0, 3)] = transform.location.x;
    extrinsic[(1, 3)] = transform.location.y;
    extrinsic[(2, 3)] = transform.location.z;
    extrinsic
}

/// Mount height at which a top-down camera's field of view covers a square
/// ground footprint: `height = (footprint/2) / tan(fov/2)`.
pub fn topdown_mount_height(footprint: f64, fov_degrees: f64) -> f64 {
    (footprint / 2.0) / (fov_degrees.to_radians() / 2.0).tan()
}

/// Full per-sensor calibration record for `sensors.json`
pub fn sensor_calibration(
    kind: CameraKind,
    mount: Transform,
    options: CaptureOptions,
) -> SensorCalibration {
    SensorCalibration {
        sensor_type: kind.blueprint_id().to_string(),
        sensor_options: options,
        intrinsic: matrix3_rows(&intrinsic_matrix(&options)),
        transform: MountTransform::from(mount),
        extrinsic: matrix4_rows(&extrinsic_matrix(&mount)),
    }
}

/// Row-major array view of a 3×3 matrix
pub fn matrix3_rows(matrix: &Matrix3<f64>) -> [[f64; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = matrix[(i, j)];
        }
    }
    rows
}

/// Row-major array view of a 4×4 matrix
pub fn matrix4_rows(matrix: &Matrix4<f64>) -> [[f64; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = matrix[(i, j)];
        }
    }
    rows
}
