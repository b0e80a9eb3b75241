//! FrameStream trait - camera delivery channel abstraction
//!
//! Defines a unified interface for camera frame delivery, decoupling the
//! sensor wrapper from the concrete simulator binding. Real simulator streams
//! and mock streams are handled uniformly.

use std::sync::Arc;

use crate::{CameraKind, RawImage};

/// Frame delivery callback type
///
/// The simulator invokes this on its own notification mechanism, concurrently
/// with the control thread. Uses `Arc` so the callback can be shared across
/// contexts.
pub type FrameCallback = Arc<dyn Fn(RawImage) + Send + Sync>;

/// Camera frame delivery source
///
/// Abstracts the common behavior of real simulator camera streams and mock
/// streams.
///
/// # Design Principles
///
/// 1. **Decoupling**: separates frame production from frame consumption
/// 2. **Unified Interface**: mock and real streams use the same API
/// 3. **Callback Pattern**: matches the simulator's native listen semantics
pub trait FrameStream: Send + Sync {
    /// Camera kind producing frames on this stream
    fn kind(&self) -> CameraKind;

    /// Register the delivery callback
    ///
    /// Repeated calls are idempotent: only the first registration wins.
    fn listen(&self, callback: FrameCallback);

    /// Stop the native stream
    ///
    /// Must be called before the camera handle is released so no dangling
    /// callbacks fire afterwards.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
