//! `run` command implementation.
//!
//! Supports both real CARLA and mock modes via feature flags. When the
//! `real-carla` feature is disabled, runs against the in-process mock
//! simulator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::HarvestConfig;
use harvester::EpisodeStats;
use tracing::{info, warn};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_harvest(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding CARLA host from CLI");
        config.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port, "Overriding CARLA port from CLI");
        config.connection.port = port;
    }
    if let Some(ref save_path) = args.save_path {
        info!(save_path = %save_path.display(), "Overriding save path from CLI");
        config.run.save_path = save_path.clone();
    }
    if let Some(episodes) = args.episodes {
        info!(episodes, "Overriding episode count from CLI");
        config.run.episode_count = episodes;
    }
    if let Some(start_frame) = args.start_frame {
        info!(start_frame, "Overriding start frame from CLI");
        config.run.start_frame = Some(start_frame);
    }

    info!(
        host = %config.connection.host,
        port = config.connection.port,
        episodes = config.run.episode_count,
        num_ego = config.run.num_ego,
        num_traffic = config.run.num_traffic,
        ood = config.ood.is_some(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    // Initialize metrics (optional)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    // Graceful shutdown: the flag is checked between ticks and inside every
    // retry loop, so Ctrl+C drains through episode teardown.
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, finishing current step...");
            flag.store(true, Ordering::SeqCst);
        }
    });

    #[cfg(feature = "real-carla")]
    let summaries = run_real(&config, shutdown).await?;

    #[cfg(not(feature = "real-carla"))]
    let summaries = run_mock(&config, shutdown).await?;

    print_run_summary(&summaries);
    info!("CARLA Harvest finished");
    Ok(())
}

/// Run against a real CARLA server
#[cfg(feature = "real-carla")]
async fn run_real(
    config: &HarvestConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<Vec<EpisodeStats>> {
    use actors::{RealSimClient, SimClient};

    info!(
        host = %config.connection.host,
        port = config.connection.port,
        "Connecting to CARLA server..."
    );

    let mut client = RealSimClient::new();
    client
        .connect(
            &config.connection.host,
            config.connection.port,
            Duration::from_secs_f64(config.connection.timeout_sec),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to connect to CARLA at {}:{}",
                config.connection.host, config.connection.port
            )
        })?;

    info!("Connected to CARLA server");

    harvester::run(client, config, shutdown)
        .await
        .context("Harvest run failed")
}

/// Run against the in-process mock simulator
#[cfg(not(feature = "real-carla"))]
async fn run_mock(
    config: &HarvestConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<Vec<EpisodeStats>> {
    use actors::{MockSimClient, SimClient};

    info!("Running in MOCK mode (no CARLA server required)");

    let mut client = MockSimClient::new();
    client
        .connect(
            &config.connection.host,
            config.connection.port,
            Duration::from_secs_f64(config.connection.timeout_sec),
        )
        .await
        .context("Failed to initialize mock client")?;

    harvester::run(client, config, shutdown)
        .await
        .context("Harvest run failed")
}

fn print_run_summary(summaries: &[EpisodeStats]) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                     Harvest Statistics                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let total_frames: u64 = summaries.iter().map(|s| s.frames_persisted).sum();
    let total_respawns: usize = summaries.iter().map(|s| s.ood_respawns).sum();

    println!("📊 Overview");
    println!("   ├─ Episodes: {}", summaries.len());
    println!("   ├─ Frames persisted: {}", total_frames);
    println!("   └─ OOD respawns: {}", total_respawns);

    if !summaries.is_empty() {
        println!("\n🎬 Episodes");
        for (i, stats) in summaries.iter().enumerate() {
            let prefix = if i == summaries.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!(
                "   {} #{} {} — {} vehicles, {} capture ticks, {} frames, {:.2} fps",
                prefix,
                i,
                stats.town,
                stats.vehicles_spawned,
                stats.capture_ticks,
                stats.frames_persisted,
                stats.frames_per_second()
            );
        }
    }

    println!();
}
