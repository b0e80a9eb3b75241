//! # Observability
//!
//! 可观测性模块：采集循环的 Prometheus 指标。
//!
//! ## 使用示例
//!
//! ```ignore
//! observability::init_metrics_only(9000)?;
//! observability::record_frame_persisted();
//! ```
//!
//! Tracing 初始化由 CLI 负责；这里只提供指标导出。

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

pub use crate::metrics::{
    record_actor_spawned, record_episode_completed, record_frame_index, record_frame_persisted,
    record_ood_respawns,
};

/// 安装 Prometheus 导出器，监听 0.0.0.0:`port`
pub fn init_metrics_only(port: u16) -> Result<()> {
    let builder = PrometheusBuilder::new();
    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    metrics::describe();
    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
