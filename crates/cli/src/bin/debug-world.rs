//! Debug World Tool
//!
//! Debugging utility for terrain generation visualization and validation.
//!
//! Features:
//! - Heightmap visualization (ASCII art)
//! - Biome map display
//! - Seam validation between chunks
//! - Single-point sampling with the full height pipeline breakdown
//!
//! Usage:
//!   debug-world heightmap --seed 12345 --region -2,-2,2,2
//!   debug-world biomes --seed 12345 --region -5,-5,5,5 --output biomes.txt
//!   debug-world validate-seams --seed 12345 --region -3,-3,3,3
//!   debug-world sample --seed 12345 --x 1500 --z -220

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wanderworld_core::ChunkKey;
use wanderworld_world::{
    ChunkMeshBuilder, ChunkPayload, GenerationRequest, NoiseField, TerrainConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Terrain generation debugging utility", long_about = None)]
struct Cli {
    /// World seed
    #[arg(long, default_value_t = 12345, global = true)]
    seed: u32,

    /// Chunk edge length in world units
    #[arg(long, default_value_t = 128.0, global = true)]
    chunk_size: f64,

    /// Terrain config (TOML, `[terrain]` table or bare); defaults if omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Visualize terrain heights as ASCII art
    Heightmap(MapArgs),
    /// Display biome distribution map
    Biomes(MapArgs),
    /// Check that adjacent chunks agree on every shared edge vertex
    ValidateSeams {
        /// Chunk region: min_x,min_z,max_x,max_z
        #[arg(long)]
        region: Region,
        /// Grid subdivisions per chunk
        #[arg(long, default_value_t = 32)]
        resolution: u32,
    },
    /// Print every intermediate value at one world position
    Sample {
        /// World X
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        /// World Z
        #[arg(long, allow_hyphen_values = true)]
        z: f64,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct MapArgs {
    /// Chunk region: min_x,min_z,max_x,max_z
    #[arg(long)]
    region: Region,
    /// World units per character
    #[arg(long, default_value_t = 16.0)]
    cell: f64,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
struct Region {
    min_x: i32,
    min_z: i32,
    max_x: i32,
    max_z: i32,
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>().map_err(|e| format!("invalid coordinate {p:?}: {e}")))
            .collect::<Result<_, _>>()?;
        let [min_x, min_z, max_x, max_z] = parts[..] else {
            return Err("region format: min_x,min_z,max_x,max_z".to_string());
        };
        if min_x > max_x || min_z > max_z {
            return Err("region minimum must not exceed maximum".to_string());
        }
        Ok(Self {
            min_x,
            min_z,
            max_x,
            max_z,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let terrain = load_terrain(cli.config.as_ref())?;
    let field = NoiseField::new(cli.seed, terrain);

    match cli.command {
        Command::Heightmap(args) => {
            let map = heightmap(&field, cli.chunk_size, &args);
            emit(map, args.output, "Heightmap")
        }
        Command::Biomes(args) => {
            let map = biome_map(&field, cli.chunk_size, &args);
            emit(map, args.output, "Biome map")
        }
        Command::ValidateSeams { region, resolution } => {
            validate_seams(field, cli.chunk_size, region, resolution)
        }
        Command::Sample { x, z, json } => {
            sample(&field, cli.chunk_size, x, z, json);
            Ok(())
        }
    }
}

fn load_terrain(path: Option<&PathBuf>) -> Result<TerrainConfig> {
    let Some(path) = path else {
        return Ok(TerrainConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read terrain config at {}", path.display()))?;
    let value: toml::Value = toml::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let table = value.get("terrain").cloned().unwrap_or(value);
    table
        .try_into()
        .with_context(|| format!("invalid terrain config in {}", path.display()))
}

fn emit(text: String, output: Option<PathBuf>, what: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, text.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{what} saved to: {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// World-space sample positions covering a chunk region.
fn grid(region: Region, chunk_size: f64, cell: f64) -> (Vec<f64>, Vec<f64>) {
    let cell = cell.max(1.0);
    // Chunks are centred on key * size.
    let start_x = (f64::from(region.min_x) - 0.5) * chunk_size;
    let end_x = (f64::from(region.max_x) + 0.5) * chunk_size;
    let start_z = (f64::from(region.min_z) - 0.5) * chunk_size;
    let end_z = (f64::from(region.max_z) + 0.5) * chunk_size;
    let steps = |start: f64, end: f64| {
        let n = ((end - start) / cell).ceil() as usize;
        (0..n).map(|i| start + (i as f64 + 0.5) * cell).collect::<Vec<_>>()
    };
    (steps(start_x, end_x), steps(start_z, end_z))
}

fn header(title: &str, field: &NoiseField, region: Region) -> String {
    format!(
        "{title} (Seed: {})\nRegion: chunks ({}, {}) to ({}, {})\n",
        field.root_seed(),
        region.min_x,
        region.min_z,
        region.max_x,
        region.max_z
    )
}

fn heightmap(field: &NoiseField, chunk_size: f64, args: &MapArgs) -> String {
    let (xs, zs) = grid(args.region, chunk_size, args.cell);
    let rows: Vec<Vec<f64>> = zs
        .iter()
        .map(|&z| xs.iter().map(|&x| field.sample(x, z).height).collect())
        .collect();

    let (lo, hi) = rows
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));

    let mut out = header("Heightmap Visualization", field, args.region);
    out.push_str(&format!("Height range: {lo:.1} to {hi:.1}\n"));
    out.push_str("\nLegend: █ = high, ▓ = med-high, ▒ = med-low, ░ = low, · = very low\n\n");
    for row in rows {
        for h in row {
            let normalized = if hi > lo { (h - lo) / (hi - lo) } else { 0.5 };
            out.push(match normalized {
                n if n > 0.8 => '█',
                n if n > 0.6 => '▓',
                n if n > 0.4 => '▒',
                n if n > 0.2 => '░',
                _ => '·',
            });
        }
        out.push('\n');
    }
    out
}

fn biome_map(field: &NoiseField, chunk_size: f64, args: &MapArgs) -> String {
    let (xs, zs) = grid(args.region, chunk_size, args.cell);
    let mut out = header("Biome Map", field, args.region);
    out.push_str("\nLegend:\n");
    out.push_str("  ~ = Ocean   . = Beach   \" = Grassland   T = Forest\n");
    out.push_str("  ^ = Rocky   * = Snow    _ = DryBasin\n\n");
    for &z in &zs {
        for &x in &xs {
            out.push(field.sample(x, z).biome.glyph());
        }
        out.push('\n');
    }
    out
}

fn edge(payload: &ChunkPayload, along_x: bool, at_end: bool) -> Vec<[f32; 4]> {
    let row = payload.row_len();
    let fixed = if at_end { row - 1 } else { 0 };
    (0..row)
        .map(|i| {
            let (ix, iz) = if along_x { (i, fixed) } else { (fixed, i) };
            let v = ix + row * iz;
            let w = &payload.world_vertices[3 * v..3 * v + 3];
            [w[0], w[1], w[2], f32::from(payload.biome_ids[v])]
        })
        .collect()
}

fn validate_seams(field: NoiseField, chunk_size: f64, region: Region, resolution: u32) -> Result<()> {
    println!("Validating chunk seams...");
    println!("Seed: {}", field.root_seed());
    println!(
        "Region: chunks ({}, {}) to ({}, {}), resolution {resolution}",
        region.min_x, region.min_z, region.max_x, region.max_z
    );
    println!();

    let builder = ChunkMeshBuilder::new(Arc::new(field));
    let build = |x: i32, z: i32| builder.build(&GenerationRequest::new(ChunkKey::new(x, z), chunk_size, resolution));

    let mut total = 0usize;
    let mut mismatches = 0usize;
    let mut max_diff = 0f32;
    let mut compare = |a: Vec<[f32; 4]>, b: Vec<[f32; 4]>| {
        for (va, vb) in a.iter().zip(&b) {
            total += 1;
            if va != vb {
                mismatches += 1;
                max_diff = max_diff.max((va[1] - vb[1]).abs());
            }
        }
    };

    for z in region.min_z..=region.max_z {
        for x in region.min_x..=region.max_x {
            let chunk = build(x, z)?;
            if x < region.max_x {
                let east = build(x + 1, z)?;
                compare(edge(&chunk, false, true), edge(&east, false, false));
            }
            if z < region.max_z {
                let south = build(x, z + 1)?;
                compare(edge(&chunk, true, true), edge(&south, true, false));
            }
        }
    }

    info!(checked = total, mismatches, "Seam validation finished");
    println!("  Shared vertices checked: {total}");
    println!("  Mismatches found:        {mismatches}");
    if total > 0 {
        println!(
            "  Match rate:              {:.2}%",
            (total - mismatches) as f64 / total as f64 * 100.0
        );
    }
    if mismatches > 0 {
        println!("  Max height discrepancy:  {max_diff}");
        bail!("chunk seams are not continuous");
    }
    println!();
    println!("All chunk seams are continuous");
    Ok(())
}

fn sample(field: &NoiseField, chunk_size: f64, x: f64, z: f64, json: bool) {
    let shaped = field.shaped_height(x, z);
    let climate = field.climate(x, z, shaped);
    let result = field.sample(x, z);
    let key = ChunkKey::from_world(x, z, chunk_size);

    if json {
        let value = serde_json::json!({
            "seed": field.root_seed(),
            "chunk": [key.x, key.z],
            "x": x,
            "z": z,
            "shaped_height": shaped,
            "temperature": climate.temperature,
            "moisture": climate.moisture,
            "water_presence": climate.water_presence,
            "height": result.height,
            "biome": result.biome,
        });
        println!("{value:#}");
        return;
    }

    println!("Sample at ({x}, {z}), seed {}", field.root_seed());
    println!("  Chunk:             {key}");
    println!("  Shaped height:     {shaped:.3}");
    println!("  Temperature:       {:.3}", climate.temperature);
    println!("  Moisture:          {:.3}", climate.moisture);
    println!("  Water presence:    {:.3}", climate.water_presence);
    println!("  Final height:      {:.3}", result.height);
    println!("  Biome:             {:?} ({})", result.biome, result.biome.glyph());
}
