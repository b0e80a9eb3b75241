//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    connection: ConnectionInfo,
    world: WorldInfo,
    run: RunInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    ood: Option<OodInfo>,
}

#[derive(Serialize)]
struct ConnectionInfo {
    host: String,
    port: u16,
    timeout_sec: f64,
    traffic_manager_port: u16,
}

#[derive(Serialize)]
struct WorldInfo {
    tick_interval: f64,
    towns: Vec<String>,
}

#[derive(Serialize)]
struct RunInfo {
    save_path: String,
    episode_count: u32,
    episode_length: u32,
    num_ego: u32,
    num_traffic: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_frame: Option<u64>,
}

#[derive(Serialize)]
struct OodInfo {
    classes: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &contracts::HarvestConfig) -> ConfigInfo {
    let towns = config
        .world
        .towns
        .clone()
        .unwrap_or_else(|| contracts::TOWN_ROTATION.iter().map(|t| t.to_string()).collect());

    ConfigInfo {
        version: format!("{:?}", config.version),
        connection: ConnectionInfo {
            host: config.connection.host.clone(),
            port: config.connection.port,
            timeout_sec: config.connection.timeout_sec,
            traffic_manager_port: config.connection.traffic_manager_port,
        },
        world: WorldInfo {
            tick_interval: config.world.tick_interval,
            towns,
        },
        run: RunInfo {
            save_path: config.run.save_path.display().to_string(),
            episode_count: config.run.episode_count,
            episode_length: config.run.episode_length,
            num_ego: config.run.num_ego,
            num_traffic: config.run.num_traffic,
            start_frame: config.run.start_frame,
        },
        ood: config.ood.as_ref().map(|ood| OodInfo {
            classes: ood.classes.clone(),
        }),
    }
}

fn print_config_info(config: &contracts::HarvestConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CARLA Harvest Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🔌 Connection");
    println!("   ├─ Version: {:?}", config.version);
    println!(
        "   ├─ CARLA Server: {}:{}",
        config.connection.host, config.connection.port
    );
    println!("   ├─ Timeout: {}s", config.connection.timeout_sec);
    println!(
        "   └─ Traffic Manager: port {}",
        config.connection.traffic_manager_port
    );

    println!("\n🌍 World");
    println!("   ├─ Tick interval: {}s", config.world.tick_interval);
    match &config.world.towns {
        Some(towns) => println!("   └─ Towns (override): {:?}", towns),
        None => println!("   └─ Towns: built-in rotation"),
    }

    println!("\n🎬 Run");
    println!("   ├─ Save path: {}", config.run.save_path.display());
    println!("   ├─ Episodes: {}", config.run.episode_count);
    println!(
        "   ├─ Episode length: {} capture ticks",
        config.run.episode_length
    );
    println!("   ├─ Ego vehicles: {}", config.run.num_ego);
    println!("   ├─ Traffic vehicles: {}", config.run.num_traffic);
    match config.run.start_frame {
        Some(start) => println!("   └─ Start frame: {}", start),
        None => println!("   └─ Start frame: resume from dataset"),
    }

    match &config.ood {
        Some(ood) => {
            println!("\n🦌 OOD ({} classes)", ood.classes.len());
            for (i, class) in ood.classes.iter().enumerate() {
                let prefix = if i == ood.classes.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!("   {} {}", prefix, class);
            }
        }
        None => println!("\n🦌 OOD: disabled"),
    }

    println!();
}
