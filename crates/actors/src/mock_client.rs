//! Mock 模拟器客户端
//!
//! 用于单元测试与无 CARLA 开发的 mock 实现，支持注入失败场景。
//!
//! Frame delivery runs synchronously inside `tick`, preserving the invariant
//! that a confirmed world step implies all camera captures for that step have
//! been delivered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    ActorId, BodyBlueprint, CameraKind, CaptureOptions, FrameCallback, FrameStream, HarvestError,
    Location, MapLayer, RawImage, Result, Transform, WeatherPreset,
};
use tracing::{debug, instrument};

use crate::client::SimClient;

/// Mock 客户端配置
#[derive(Debug, Clone)]
pub struct MockSimConfig {
    /// 预定义 spawn point 数量（沿 x 轴间隔 10m 排布）
    pub spawn_points: usize,
    /// 前 N 次 try_spawn_body 返回“点位被占用”
    pub occupied_attempts: u32,
    /// 连接应当失败
    pub fail_connect: bool,
    /// 从第 N 次 tick 开始步进失败
    pub fail_tick_after: Option<u64>,
    /// 可用车辆蓝图库
    pub library: Vec<BodyBlueprint>,
}

impl Default for MockSimConfig {
    fn default() -> Self {
        Self {
            spawn_points: 32,
            occupied_attempts: 0,
            fail_connect: false,
            fail_tick_after: None,
            library: default_library(),
        }
    }
}

fn default_library() -> Vec<BodyBlueprint> {
    vec![
        BodyBlueprint::new("vehicle.dodge.charger_2020", 4),
        BodyBlueprint::new("vehicle.audi.tt", 4),
        BodyBlueprint::new("vehicle.bmw.grandtourer", 4),
        BodyBlueprint::new("vehicle.nissan.patrol", 4),
        BodyBlueprint::new("vehicle.tesla.cybertruck", 4),
        BodyBlueprint::new("vehicle.micro.microlino", 4),
        BodyBlueprint::new("vehicle.mercedes.sprinter", 4),
        BodyBlueprint::new("vehicle.kawasaki.ninja", 2),
        BodyBlueprint::new("vehicle.bh.crossbike", 2),
    ]
}

struct MockActor {
    blueprint: String,
    location: Location,
}

struct StreamState {
    kind: CameraKind,
    width: u32,
    height: u32,
    listening: AtomicBool,
    callback: Mutex<Option<FrameCallback>>,
}

struct MockWorldState {
    map: Option<String>,
    weather: Option<WeatherPreset>,
    synchronous: bool,
    fixed_delta: f64,
    tick_count: u64,
    occupied_remaining: u32,
    unloaded_layers: Vec<MapLayer>,
    autopilot: HashMap<ActorId, u16>,
    actors: HashMap<ActorId, MockActor>,
    streams: HashMap<ActorId, Arc<StreamState>>,
}

/// Mock 模拟器客户端
pub struct MockSimClient {
    config: MockSimConfig,
    connected: Mutex<bool>,
    /// Actor ID 计数器（从 1000 开始，便于识别）
    next_actor_id: AtomicU32,
    state: Mutex<MockWorldState>,
}

impl MockSimClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockSimConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockSimConfig) -> Self {
        let occupied_remaining = config.occupied_attempts;
        Self {
            config,
            connected: Mutex::new(false),
            next_actor_id: AtomicU32::new(1000),
            state: Mutex::new(MockWorldState {
                map: None,
                weather: None,
                synchronous: false,
                fixed_delta: 0.0,
                tick_count: 0,
                occupied_remaining,
                unloaded_layers: Vec::new(),
                autopilot: HashMap::new(),
                actors: HashMap::new(),
                streams: HashMap::new(),
            }),
        }
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<()> {
        if *self.connected.lock().unwrap() {
            Ok(())
        } else {
            Err(HarvestError::connection("not connected"))
        }
    }

    // ===== Test accessors =====

    /// 当前存活 actor 数量
    pub fn actor_count(&self) -> usize {
        self.state.lock().unwrap().actors.len()
    }

    /// 所有存活 actor IDs
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.state.lock().unwrap().actors.keys().copied().collect()
    }

    /// 已执行的 tick 数
    pub fn tick_count(&self) -> u64 {
        self.state.lock().unwrap().tick_count
    }

    /// 当前加载的地图
    pub fn loaded_map(&self) -> Option<String> {
        self.state.lock().unwrap().map.clone()
    }

    /// 当前天气
    pub fn weather(&self) -> Option<WeatherPreset> {
        self.state.lock().unwrap().weather
    }

    /// 同步步进是否已启用
    pub fn is_synchronous(&self) -> bool {
        self.state.lock().unwrap().synchronous
    }

    /// 已卸载的地图层
    pub fn unloaded_layers(&self) -> Vec<MapLayer> {
        self.state.lock().unwrap().unloaded_layers.clone()
    }

    /// 移动一个 actor（测试用，模拟物理漂移）
    pub fn set_actor_location(&self, actor_id: ActorId, location: Location) {
        let mut state = self.state.lock().unwrap();
        if let Some(actor) = state.actors.get_mut(&actor_id) {
            actor.location = location;
        }
    }

    /// 查询 actor 蓝图（测试用）
    pub fn actor_blueprint(&self, actor_id: ActorId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .actors
            .get(&actor_id)
            .map(|actor| actor.blueprint.clone())
    }
}

impl Default for MockSimClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClient for MockSimClient {
    #[instrument(name = "mock_sim_connect", skip(self, _timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        let _ = (host, port);
        if self.config.fail_connect {
            return Err(HarvestError::connection("mock connect failure"));
        }
        *self.connected.lock().unwrap() = true;
        Ok(())
    }

    #[instrument(name = "mock_sim_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        self.ensure_connected()?;
        let mut state = self.state.lock().unwrap();

        // 整体替换世界：所有旧 handle 立即失效
        state.actors.clear();
        for stream in state.streams.values() {
            stream.listening.store(false, Ordering::SeqCst);
            stream.callback.lock().unwrap().take();
        }
        state.streams.clear();
        state.autopilot.clear();
        state.unloaded_layers.clear();
        state.map = Some(map.to_string());

        debug!(map, "mock world loaded");
        Ok(())
    }

    #[instrument(name = "mock_sim_sync_stepping", skip(self))]
    async fn configure_sync_stepping(&self, fixed_delta_seconds: f64) -> Result<()> {
        self.ensure_connected()?;
        let mut state = self.state.lock().unwrap();
        state.synchronous = true;
        state.fixed_delta = fixed_delta_seconds;
        Ok(())
    }

    #[instrument(name = "mock_sim_unload_layer", skip(self), fields(layer = ?layer))]
    async fn unload_layer(&self, layer: MapLayer) -> Result<()> {
        self.ensure_connected()?;
        self.state.lock().unwrap().unloaded_layers.push(layer);
        Ok(())
    }

    #[instrument(name = "mock_sim_set_weather", skip(self), fields(preset = ?preset))]
    async fn set_weather(&self, preset: WeatherPreset) -> Result<()> {
        self.ensure_connected()?;
        self.state.lock().unwrap().weather = Some(preset);
        Ok(())
    }

    async fn tick(&self) -> Result<()> {
        self.ensure_connected()?;

        let (tick, streams) = {
            let mut state = self.state.lock().unwrap();
            if let Some(limit) = self.config.fail_tick_after {
                if state.tick_count >= limit {
                    return Err(HarvestError::step("mock step failure"));
                }
            }
            state.tick_count += 1;
            let streams: Vec<Arc<StreamState>> = state.streams.values().cloned().collect();
            (state.tick_count, streams)
        };

        // Synchronous delivery: every listening camera receives its frame for
        // this step before tick() returns.
        for stream in streams {
            if !stream.listening.load(Ordering::Relaxed) {
                continue;
            }
            let callback = stream.callback.lock().unwrap().clone();
            if let Some(callback) = callback {
                callback(synthetic_frame(stream.width, stream.height, tick));
            }
        }

        Ok(())
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.ensure_connected()?;
        Ok((0..self.config.spawn_points)
            .map(|i| Transform::at(10.0 * i as f64, 0.0, 0.3))
            .collect())
    }

    async fn vehicle_blueprints(&self) -> Result<Vec<BodyBlueprint>> {
        self.ensure_connected()?;
        Ok(self.config.library.clone())
    }

    #[instrument(name = "mock_sim_try_spawn_body", skip(self, at), fields(blueprint = %blueprint))]
    async fn try_spawn_body(&self, blueprint: &str, at: &Transform) -> Result<Option<ActorId>> {
        self.ensure_connected()?;

        let mut state = self.state.lock().unwrap();
        if state.occupied_remaining > 0 {
            state.occupied_remaining -= 1;
            return Ok(None);
        }

        let actor_id = self.allocate_actor_id();
        state.actors.insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                location: at.location,
            },
        );
        Ok(Some(actor_id))
    }

    #[instrument(
        name = "mock_sim_spawn_camera",
        skip(self, mount, options),
        fields(kind = ?kind, parent)
    )]
    async fn spawn_camera(
        &self,
        kind: CameraKind,
        mount: &Transform,
        parent: ActorId,
        options: &CaptureOptions,
    ) -> Result<ActorId> {
        self.ensure_connected()?;

        let mut state = self.state.lock().unwrap();
        if !state.actors.contains_key(&parent) {
            return Err(HarvestError::ActorNotFound { actor_id: parent });
        }

        let actor_id = self.allocate_actor_id();
        state.actors.insert(
            actor_id,
            MockActor {
                blueprint: kind.blueprint_id().to_string(),
                location: mount.location,
            },
        );
        state.streams.insert(
            actor_id,
            Arc::new(StreamState {
                kind,
                width: options.image_size_x,
                height: options.image_size_y,
                listening: AtomicBool::new(false),
                callback: Mutex::new(None),
            }),
        );
        Ok(actor_id)
    }

    #[instrument(name = "mock_sim_set_autopilot", skip(self), fields(actor_id, tm_port))]
    async fn set_autopilot(&self, actor_id: ActorId, tm_port: u16) -> Result<()> {
        self.ensure_connected()?;
        let mut state = self.state.lock().unwrap();
        if !state.actors.contains_key(&actor_id) {
            return Err(HarvestError::ActorNotFound { actor_id });
        }
        state.autopilot.insert(actor_id, tm_port);
        Ok(())
    }

    #[instrument(name = "mock_sim_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if let Some(stream) = state.streams.remove(&actor_id) {
            stream.listening.store(false, Ordering::SeqCst);
            stream.callback.lock().unwrap().take();
        }

        // 幂等：即使不存在也返回 Ok
        state.actors.remove(&actor_id);
        state.autopilot.remove(&actor_id);
        Ok(())
    }

    async fn actor_is_alive(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.state.lock().unwrap().actors.contains_key(&actor_id))
    }

    async fn actor_location(&self, actor_id: ActorId) -> Result<Location> {
        self.state
            .lock()
            .unwrap()
            .actors
            .get(&actor_id)
            .map(|actor| actor.location)
            .ok_or(HarvestError::ActorNotFound { actor_id })
    }

    fn frame_stream(&self, actor_id: ActorId) -> Option<Box<dyn FrameStream>> {
        let state = self.state.lock().unwrap();
        let stream = state.streams.get(&actor_id)?.clone();
        Some(Box::new(MockFrameStream { state: stream }))
    }
}

/// Deterministic BGRA test pattern; the blue channel carries the tick number
/// so tests can observe frame turnover.
fn synthetic_frame(width: u32, height: u32, tick: u64) -> RawImage {
    let pixel = [(tick % 256) as u8, 64, 192, 255];
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&pixel);
    }
    RawImage {
        width,
        height,
        data: Bytes::from(data),
    }
}

/// Frame stream over a mock camera
pub struct MockFrameStream {
    state: Arc<StreamState>,
}

impl FrameStream for MockFrameStream {
    fn kind(&self) -> CameraKind {
        self.state.kind
    }

    fn listen(&self, callback: FrameCallback) {
        // Idempotent: only the first registration wins
        if self.state.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.callback.lock().unwrap() = Some(callback);
    }

    fn stop(&self) {
        if self.state.listening.swap(false, Ordering::SeqCst) {
            self.state.callback.lock().unwrap().take();
        }
    }

    fn is_listening(&self) -> bool {
        self.state.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected() -> MockSimClient {
        let mut client = MockSimClient::new();
        client
            .connect("localhost", 2000, Duration::from_secs(5))
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn spawn_and_destroy_is_idempotent() {
        let client = connected().await;
        client.load_world("Town01").await.unwrap();

        let actor_id = client
            .try_spawn_body("vehicle.audi.tt", &Transform::at(0.0, 0.0, 0.3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.actor_count(), 1);

        client.destroy_actor(actor_id).await.unwrap();
        client.destroy_actor(actor_id).await.unwrap();
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn load_world_invalidates_actors() {
        let client = connected().await;
        client.load_world("Town01").await.unwrap();
        client
            .try_spawn_body("vehicle.audi.tt", &Transform::at(0.0, 0.0, 0.3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.actor_count(), 1);

        client.load_world("Town02").await.unwrap();
        assert_eq!(client.actor_count(), 0);
        assert_eq!(client.loaded_map().as_deref(), Some("Town02"));
    }

    #[tokio::test]
    async fn occupied_points_then_success() {
        let client = {
            let mut client = MockSimClient::with_config(MockSimConfig {
                occupied_attempts: 2,
                ..Default::default()
            });
            client
                .connect("localhost", 2000, Duration::from_secs(5))
                .await
                .unwrap();
            client
        };
        client.load_world("Town01").await.unwrap();

        let at = Transform::at(0.0, 0.0, 0.3);
        assert!(client.try_spawn_body("bp", &at).await.unwrap().is_none());
        assert!(client.try_spawn_body("bp", &at).await.unwrap().is_none());
        assert!(client.try_spawn_body("bp", &at).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tick_delivers_frames_synchronously() {
        let client = connected().await;
        client.load_world("Town01").await.unwrap();

        let parent = client
            .try_spawn_body("vehicle.audi.tt", &Transform::at(0.0, 0.0, 0.3))
            .await
            .unwrap()
            .unwrap();
        let camera = client
            .spawn_camera(
                CameraKind::Rgb,
                &Transform::at(0.0, 0.0, 2.4),
                parent,
                &CaptureOptions {
                    image_size_x: 4,
                    image_size_y: 2,
                    fov: 90.0,
                },
            )
            .await
            .unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let stream = client.frame_stream(camera).unwrap();
        stream.listen(Arc::new(move |raw: RawImage| {
            sink.lock().unwrap().push(raw.data[0]);
        }));

        client.tick().await.unwrap();
        client.tick().await.unwrap();

        // Blue channel carries the tick number; both deliveries are complete
        // by the time tick() returned.
        assert_eq!(*received.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn tick_failure_injection() {
        let client = {
            let mut client = MockSimClient::with_config(MockSimConfig {
                fail_tick_after: Some(1),
                ..Default::default()
            });
            client
                .connect("localhost", 2000, Duration::from_secs(5))
                .await
                .unwrap();
            client
        };
        client.load_world("Town01").await.unwrap();

        client.tick().await.unwrap();
        let err = client.tick().await.unwrap_err();
        assert!(matches!(err, HarvestError::Step { .. }));
    }

    #[tokio::test]
    async fn requires_connection() {
        let client = MockSimClient::new();
        assert!(client.load_world("Town01").await.is_err());
        assert!(client.tick().await.is_err());
    }
}
