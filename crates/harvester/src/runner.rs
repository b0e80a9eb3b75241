//! Multi-episode run driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actors::{RigSpec, SimClient};
use contracts::{HarvestConfig, Result};
use tracing::{info, warn};

use crate::environment::Environment;
use crate::stats::EpisodeStats;

/// Run the configured number of episodes back-to-back over one client.
///
/// The frame index is seeded once before the first episode and never reset,
/// so successive runs append to the dataset. A shutdown request between
/// episodes stops cleanly with the completed summaries.
pub async fn run<C: SimClient>(
    client: C,
    config: &HarvestConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<Vec<EpisodeStats>> {
    let mut environment = Environment::new(client, config, shutdown.clone());
    environment.resolve_start_frame(config.run.start_frame, &config.run.save_path)?;

    let rig = RigSpec::ego_default();
    let episode = config.episode();

    let mut summaries = Vec::with_capacity(config.run.episode_count as usize);
    for index in 0..config.run.episode_count {
        if shutdown.load(Ordering::Relaxed) {
            warn!(completed = summaries.len(), "shutdown requested, stopping run");
            break;
        }

        info!(
            episode = index,
            total = config.run.episode_count,
            "starting episode"
        );
        let stats = environment.run_episode(&episode, &rig).await?;
        info!(
            episode = index,
            town = %stats.town,
            frames = stats.frames_persisted,
            ood_respawns = stats.ood_respawns,
            fps = format!("{:.2}", stats.frames_per_second()),
            "episode complete"
        );
        summaries.push(stats);
    }

    Ok(summaries)
}
