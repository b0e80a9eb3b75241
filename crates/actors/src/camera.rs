//! Camera sensor wrapper
//!
//! Owns one simulator-side camera handle, buffers the most recent decoded
//! frame, and exposes fetch/tick/destroy. Frame delivery is asynchronous
//! relative to the control thread: the stream callback overwrites the buffer
//! whenever the simulator delivers, while `fetch()` snapshots it without
//! blocking.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::{
    ActorId, CameraFrame, CameraKind, CaptureOptions, HarvestError, RawImage, Result, Transform,
};
use tracing::{debug, error, instrument, warn};

use crate::client::SimClient;
use crate::rig::CameraSpec;

/// In-process frame consumer invoked on every capture tick
pub type FrameListener = Box<dyn Fn(&CameraFrame) + Send>;

/// One camera attached to a vehicle body.
///
/// Lifecycle: `attach` spawns the simulator actor and starts its stream
/// (Active); `destroy` stops the stream before releasing the handle
/// (Destroyed, terminal). Double-destroy is a no-op.
pub struct Camera {
    kind: CameraKind,
    mount: Transform,
    options: CaptureOptions,
    actor_id: Option<ActorId>,
    stream: Option<Box<dyn contracts::FrameStream>>,
    last_frame: Arc<Mutex<CameraFrame>>,
    listeners: Vec<FrameListener>,
}

impl Camera {
    /// Spawn a camera actor attached to `parent` and start listening.
    ///
    /// The frame buffer starts zero-filled at the capture resolution; the
    /// stream callback replaces it with decoded RGB frames as they arrive.
    #[instrument(
        name = "camera_attach",
        skip(client, spec),
        fields(camera = %spec.name, kind = ?spec.kind, parent)
    )]
    pub async fn attach<C: SimClient>(client: &C, parent: ActorId, spec: &CameraSpec) -> Result<Self> {
        let actor_id = client
            .spawn_camera(spec.kind, &spec.mount, parent, &spec.options)
            .await?;

        let stream = client
            .frame_stream(actor_id)
            .ok_or(HarvestError::ActorNotFound { actor_id })?;

        let last_frame = Arc::new(Mutex::new(CameraFrame::zeroed(
            spec.options.image_size_x,
            spec.options.image_size_y,
        )));

        let slot = last_frame.clone();
        let expected = (spec.options.image_size_x, spec.options.image_size_y);
        stream.listen(Arc::new(move |raw: RawImage| {
            if (raw.width, raw.height) != expected {
                warn!(
                    width = raw.width,
                    height = raw.height,
                    "dropping frame with unexpected resolution"
                );
                return;
            }
            *slot.lock().unwrap() = decode_bgra_frame(&raw);
        }));

        debug!(actor_id, "camera attached and listening");

        Ok(Self {
            kind: spec.kind,
            mount: spec.mount,
            options: spec.options,
            actor_id: Some(actor_id),
            stream: Some(stream),
            last_frame,
            listeners: Vec::new(),
        })
    }

    pub fn kind(&self) -> CameraKind {
        self.kind
    }

    pub fn mount(&self) -> Transform {
        self.mount
    }

    pub fn options(&self) -> CaptureOptions {
        self.options
    }

    /// Snapshot of the most recent decoded frame.
    ///
    /// Non-blocking: may return a frame already consumed, or the initial zero
    /// buffer if nothing has arrived yet.
    pub fn fetch(&self) -> CameraFrame {
        self.last_frame.lock().unwrap().clone()
    }

    /// Register an in-process frame consumer
    pub fn on_frame(&mut self, listener: FrameListener) {
        self.listeners.push(listener);
    }

    /// Feed the current frame to every registered listener
    pub fn tick(&self) {
        if self.actor_id.is_none() {
            return;
        }
        let frame = self.fetch();
        for listener in &self.listeners {
            listener(&frame);
        }
    }

    /// Stop the stream and release the simulator handle.
    ///
    /// Idempotent: the stream is stopped before the handle is released so no
    /// dangling callback can fire, and a second call does nothing.
    #[instrument(name = "camera_destroy", skip(self, client), fields(kind = ?self.kind))]
    pub async fn destroy<C: SimClient>(&mut self, client: &C) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }

        if let Some(actor_id) = self.actor_id.take() {
            if let Err(e) = client.destroy_actor(actor_id).await {
                error!(actor_id, error = %e, "failed to destroy camera actor");
            }
        }

        self.listeners.clear();
    }

    /// True until `destroy` has run
    pub fn is_active(&self) -> bool {
        self.actor_id.is_some()
    }
}

/// Decode a raw 4-channel BGRA delivery into a 3-channel RGB frame: drop
/// alpha, reverse channel order.
pub fn decode_bgra_frame(raw: &RawImage) -> CameraFrame {
    let mut rgb = Vec::with_capacity((raw.width * raw.height * 3) as usize);
    for pixel in raw.data.chunks_exact(4) {
        rgb.push(pixel[2]);
        rgb.push(pixel[1]);
        rgb.push(pixel[0]);
    }
    CameraFrame {
        width: raw.width,
        height: raw.height,
        data: Bytes::from(rgb),
    }
}
