use anyhow::{bail, Context, Result};
use glam::Vec3;
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use wanderworld_physics::TerrainPhysics;
use wanderworld_render::SceneGraph;
use wanderworld_streaming::{
    ExplorerSettings, QueueDepths, StreamingError, StreamingStats, TerrainExplorer,
};

/// Camera height above the ground.
const EYE_HEIGHT: f32 = 1.8;
const FRAME_DT: f32 = 1.0 / 60.0;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(120);

pub struct HeadlessConfig {
    pub settings: ExplorerSettings,
    /// Frames to walk before draining.
    pub frames: u64,
    /// Walking speed in world units per second.
    pub speed: f32,
    /// Heading in degrees, 0 = +X, 90 = +Z.
    pub heading_degrees: f32,
    /// Write the final summary here as well as to stdout.
    pub summary_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u32,
    frames: u64,
    final_position: [f32; 3],
    realized_chunks: usize,
    live_instances: usize,
    stats: StreamingStats,
    queues: QueueDepths,
}

/// Walk a straight line through the world and report what streamed.
pub fn run(cfg: HeadlessConfig) -> Result<()> {
    let seed = cfg.settings.seed;
    let mut explorer = TerrainExplorer::new(cfg.settings, SceneGraph::new(), TerrainPhysics::new());
    explorer
        .initialize()
        .context("failed to initialize terrain explorer")?;

    let heading = cfg.heading_degrees.to_radians();
    let direction = Vec3::new(heading.cos(), 0.0, heading.sin());
    let mut position = Vec3::new(0.0, EYE_HEIGHT, 0.0);
    let mut frames = 0u64;

    while frames < cfg.frames {
        position += direction * cfg.speed * FRAME_DT;
        if let Some(ground) = explorer.ground_height(position.x, position.z) {
            position.y = ground + EYE_HEIGHT;
        }
        step(&mut explorer, position)?;
        frames += 1;
        if frames % 600 == 0 {
            if let Some(manager) = explorer.manager() {
                info!(
                    frames,
                    x = position.x,
                    z = position.z,
                    realized = manager.store().len(),
                    pending = manager.queue_depths().pending,
                    "Walking"
                );
            }
        }
    }

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        step(&mut explorer, position)?;
        frames += 1;
        let idle = explorer.manager().map_or(true, |m| m.is_idle());
        if idle {
            break;
        }
        if Instant::now() > deadline {
            warn!("Streaming did not settle before the drain timeout");
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }

    let Some(manager) = explorer.manager() else {
        bail!("terrain explorer lost its scheduler");
    };
    let summary = RunSummary {
        seed,
        frames,
        final_position: position.to_array(),
        realized_chunks: manager.store().len(),
        live_instances: manager.entities().live_instances(),
        stats: manager.stats(),
        queues: manager.queue_depths(),
    };
    info!(
        frames,
        realized = summary.realized_chunks,
        materialized = summary.stats.materialized,
        destroyed = summary.stats.destroyed,
        "Exploration finished"
    );

    let json = serde_json::to_string_pretty(&summary)?;
    println!("{json}");
    if let Some(path) = cfg.summary_out {
        std::fs::write(&path, &json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }
    explorer.dispose();
    Ok(())
}

fn step(
    explorer: &mut TerrainExplorer<SceneGraph, TerrainPhysics>,
    position: Vec3,
) -> Result<()> {
    match explorer.update(FRAME_DT, &position) {
        Ok(()) => Ok(()),
        Err(StreamingError::Halted(fault)) => {
            error!(error = %fault, "Terrain streaming halted");
            Err(StreamingError::Halted(fault).into())
        }
        Err(err) => Err(err.into()),
    }
}
