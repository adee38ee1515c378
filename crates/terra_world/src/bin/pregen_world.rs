//! # World Pregeneration Tool
//!
//! Fills a file chunk store with world chunks ahead of time, and reports
//! what a store already holds.
//!
//! Run with: cargo run --release --bin pregen_world -- generate --root ./world --radius 8
//!
//! Set `RUST_LOG=info` (or `debug`) for progress logs.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use terra_world::{ChunkService, ChunkStore, FileChunkStore, SessionContext, WorldConfig};

/// Largest accepted `--radius` (a 2001 x 2001 square of chunks).
const MAX_RADIUS: i64 = 1000;

#[derive(Parser)]
#[command(name = "pregen_world", about = "Pregenerate and inspect Terra world chunks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a square of world chunks around a center
    Generate {
        /// Store directory
        #[arg(long, short)]
        root: PathBuf,
        /// World config file (default: built-in defaults)
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Chunks on each side of the center
        #[arg(long, default_value_t = 4)]
        radius: i64,
        /// Center chunk (X Y)
        #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_hyphen_values = true, default_values_t = [0, 0])]
        center: Vec<i64>,
        /// Override the world generator seed
        #[arg(long, allow_hyphen_values = true)]
        seed: Option<i64>,
    },
    /// Print the extent of a store
    Inspect {
        /// Store directory
        #[arg(long, short)]
        root: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate {
            root,
            config,
            radius,
            center,
            seed,
        } => generate(root, config, radius, (center[0], center[1]), seed),
        Command::Inspect { root } => inspect(root),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn generate(
    root: PathBuf,
    config_path: Option<PathBuf>,
    radius: i64,
    center: (i64, i64),
    seed: Option<i64>,
) -> Result<(), String> {
    let (x_range, y_range) = square(center, radius)?;

    let mut config = match config_path {
        Some(path) => WorldConfig::load(&path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => WorldConfig::default(),
    };
    if seed.is_some() {
        config.world_generator.seed = seed;
    }
    // Pregenerated terrain must be the terrain later served.
    config.always_regenerate = false;

    let store = FileChunkStore::open(&root).map_err(|e| e.to_string())?;
    let service = ChunkService::new(config, store).map_err(|e| e.to_string())?;
    let session = SessionContext::new("pregen_world");

    let side = 2 * radius + 1;
    println!(
        "Generating {side}x{side} chunks of {0}x{0} around ({1}, {2}) into {3}",
        service.config().chunk_size,
        center.0,
        center.1,
        root.display()
    );

    let start = Instant::now();
    let mut samples = 0u64;
    for y in y_range {
        for x in x_range.clone() {
            let chunk = service
                .get_world_chunk(&session, x, y)
                .map_err(|e| format!("chunk ({x}, {y}): {e}"))?;
            samples += chunk.terrain.len() as u64;
        }
    }

    let elapsed = start.elapsed();
    println!(
        "Done: {} chunks, {samples} samples in {elapsed:?} ({:.0} samples/s)",
        side * side,
        samples as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}

/// Chunk ranges (x, y) of the square of `radius` around `center`.
fn square(center: (i64, i64), radius: i64) -> Result<(RangeInclusive<i64>, RangeInclusive<i64>), String> {
    if !(0..=MAX_RADIUS).contains(&radius) {
        return Err(format!("radius must be in 0..={MAX_RADIUS}, got {radius}"));
    }
    match (span(center.0, radius), span(center.1, radius)) {
        (Some(x_range), Some(y_range)) => Ok((x_range, y_range)),
        _ => Err(format!(
            "radius {radius} around ({}, {}) leaves the chunk grid",
            center.0, center.1
        )),
    }
}

/// Chunks `radius` either side of `center`, if the ends fit in an `i64`.
fn span(center: i64, radius: i64) -> Option<RangeInclusive<i64>> {
    Some(center.checked_sub(radius)?..=center.checked_add(radius)?)
}

fn inspect(root: PathBuf) -> Result<(), String> {
    let store = FileChunkStore::open(&root).map_err(|e| e.to_string())?;

    match store.chunk_range().map_err(|e| e.to_string())? {
        Some(range) => println!(
            "{}: world chunks span x {}..={}, y {}..={}",
            root.display(),
            range.min_x,
            range.max_x,
            range.min_y,
            range.max_y
        ),
        None => println!("{}: no world chunks", root.display()),
    }
    Ok(())
}
