// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blockly sandbox - headless drag replay
//!
//! Loads a scene file, replays its drag script against a workspace and
//! prints the resulting block trees. Every snap and bump is logged, which
//! makes the sandbox handy for checking how the connection index behaves
//! on a given layout.

mod replay;
mod scene;

use clap::Parser;
use replay::Replay;
use scene::Scene;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Replay block drags from a scene file
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Scene file (RON)
    #[arg(long, default_value = "crates/blockly_sandbox/scenes/stack.ron")]
    scene: PathBuf,

    /// Number of moves each drag is split into
    #[arg(long, default_value_t = 8)]
    steps: u32,
}

fn main() {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Blockly sandbox v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        tracing::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), scene::SceneError> {
    let scene = Scene::load(&args.scene)?;
    tracing::info!(
        "Loaded {:?}: {} blocks, {} drags",
        args.scene,
        scene.blocks.len(),
        scene.drags.len()
    );

    let mut replay = Replay::new(&scene)?;
    let records = replay.run(&scene, args.steps)?;
    for record in &records {
        match record.outcome.snapped {
            Some((mine, theirs)) => tracing::debug!("{} snapped: {} -> {}", record.block, mine, theirs),
            None => tracing::debug!("{} dropped without snapping", record.block),
        }
    }
    let bumped: usize = records.iter().map(|record| record.outcome.bumped).sum();
    let snapped = records
        .iter()
        .filter(|record| record.outcome.snapped.is_some())
        .count();
    tracing::info!("{} of {} drops snapped, {} groups bumped", snapped, records.len(), bumped);

    for line in replay.summary()? {
        println!("{line}");
    }
    Ok(())
}
