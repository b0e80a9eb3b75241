//! HarvestConfig - Config Loader 输出
//!
//! 描述完整的采集配置：连接、世界步进、运行参数、OOD 注入。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的采集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 模拟器连接
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// 世界步进设置
    #[serde(default)]
    pub world: WorldSettings,

    /// 运行参数
    pub run: RunSettings,

    /// OOD 注入 (可选)
    #[serde(default)]
    pub ood: Option<OodConfig>,
}

/// 模拟器连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// 模拟器地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 模拟器端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 连接超时 (秒)
    #[serde(default = "default_timeout")]
    pub timeout_sec: f64,

    /// 交通协调服务端口
    #[serde(default = "default_tm_port")]
    pub traffic_manager_port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_sec: default_timeout(),
            traffic_manager_port: default_tm_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2000
}

fn default_timeout() -> f64 {
    5.0
}

fn default_tm_port() -> u16 {
    8000
}

/// 世界步进设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    /// 固定步长 (秒)
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f64,

    /// 城镇轮换表覆盖 (默认使用内置轮换表)
    #[serde(default)]
    pub towns: Option<Vec<String>>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            towns: None,
        }
    }
}

fn default_tick_interval() -> f64 {
    0.05
}

/// 运行参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// 数据集根目录
    pub save_path: PathBuf,

    /// 连续运行的 episode 数
    #[serde(default = "default_episode_count")]
    pub episode_count: u32,

    /// 每个 episode 的 ego 车辆数
    #[serde(default = "default_num_ego")]
    pub num_ego: u32,

    /// 每个 episode 的背景交通车辆数
    #[serde(default)]
    pub num_traffic: u32,

    /// episode 长度 (capture tick 数)
    pub episode_length: u32,

    /// 起始帧序号；缺省时从已有数据续写 (resume)
    #[serde(default)]
    pub start_frame: Option<u64>,
}

fn default_episode_count() -> u32 {
    1
}

fn default_num_ego() -> u32 {
    1
}

/// OOD 注入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OodConfig {
    /// 可生成的 actor 类型白名单
    pub classes: Vec<String>,
}

/// Immutable per-episode parameters, derived from [`HarvestConfig`]
#[derive(Debug, Clone)]
pub struct EpisodeConfig {
    pub save_path: PathBuf,
    pub num_ego: usize,
    pub num_traffic: usize,

    /// Episode length in capture ticks (world steps = length × 5)
    pub episode_length: u32,

    /// OOD actor-type allow-list; `None` disables OOD spawning
    pub ood_classes: Option<Vec<String>>,
}

impl HarvestConfig {
    /// Per-episode view of the run parameters
    pub fn episode(&self) -> EpisodeConfig {
        EpisodeConfig {
            save_path: self.run.save_path.clone(),
            num_ego: self.run.num_ego as usize,
            num_traffic: self.run.num_traffic as usize,
            episode_length: self.run.episode_length,
            ood_classes: self.ood.as_ref().map(|ood| ood.classes.clone()),
        }
    }
}
