use std::time::Instant;

use cubeview_engine::world::World;
use cubeview_worldtool::generate::FlatGenerator;
use cubeview_worldtool::options::ToolOptions;
use cubeview_worldtool::{persistence, world_stats};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = ToolOptions::parse(std::env::args().skip(1))?;
    let start = Instant::now();
    let mut world = World::new();

    // ── Saved columns first, then fill the gaps ────────────────────────
    match persistence::load_into(&mut world, &options.world_dir) {
        Ok(0) => tracing::info!("No saved chunks in {}", options.world_dir.display()),
        Ok(n) => tracing::info!("Loaded {} chunks from {}", n, options.world_dir.display()),
        Err(e) => tracing::error!("Failed to load saved chunks: {:#}", e),
    }

    if let Some(radius) = options.generate {
        tracing::info!("Generating flat world (radius {})...", radius);
        FlatGenerator::default().generate_area(&mut world, radius);
    }

    let stats = world_stats(&world);
    tracing::info!(
        "World ready: {} chunks, {} visible voxels, {} pending ({:.2?})",
        stats.chunks,
        stats.visible_voxels,
        stats.pending,
        start.elapsed(),
    );

    // ── Save ───────────────────────────────────────────────────────────
    if options.save {
        let n = persistence::save_world(&mut world, &options.world_dir)?;
        tracing::info!("Save complete: {} chunks written", n);
    } else {
        tracing::info!("--no-save given, leaving {} untouched", options.world_dir.display());
    }
    Ok(())
}
