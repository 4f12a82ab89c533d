//! wanderworld - an infinite procedural terrain explorer
//!
//! Headless executable: walks a straight line through the world and reports
//! what the chunk streamer did along the way.

mod config;
mod headless;

use anyhow::Result;
use config::WorldConfig;
use headless::HeadlessConfig;
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting wanderworld v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let mut world = match (cli.config.as_deref(), cli.strict) {
        (Some(path), true) => WorldConfig::load_strict(path)?,
        (Some(path), false) => WorldConfig::load_from_path(path),
        (None, true) => WorldConfig::load_strict(Path::new(config::DEFAULT_WORLD_PATH))?,
        (None, false) => WorldConfig::load(),
    };
    if let Some(seed) = cli.seed {
        world.seed = seed;
    }
    if let Some(distance) = cli.render_distance {
        world.streaming.render_distance = distance.clamp(1, 16);
    }

    let settings = if cli.strict {
        world.explorer_settings_strict()?
    } else {
        world.explorer_settings()
    };

    headless::run(HeadlessConfig {
        settings,
        frames: cli.frames,
        speed: cli.speed,
        heading_degrees: cli.heading,
        summary_out: cli.summary_out,
    })
}

struct CliOptions {
    config: Option<PathBuf>,
    /// Fail on unreadable config or descriptor files instead of using defaults.
    strict: bool,
    seed: Option<u32>,
    render_distance: Option<u32>,
    frames: u64,
    speed: f32,
    heading: f32,
    summary_out: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            config: None,
            strict: false,
            seed: None,
            render_distance: None,
            frames: 3600,
            speed: 40.0,
            heading: 0.0,
            summary_out: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => match args.next() {
                    Some(path) => opts.config = Some(PathBuf::from(path)),
                    None => tracing::error!("--config requires a file path"),
                },
                "--strict" => opts.strict = true,
                "--seed" => match args.next().map(|v| v.parse::<u32>()) {
                    Some(Ok(seed)) => opts.seed = Some(seed),
                    _ => tracing::error!("--seed requires an unsigned integer"),
                },
                "--render-distance" => match args.next().map(|v| v.parse::<u32>()) {
                    Some(Ok(value)) => opts.render_distance = Some(value),
                    _ => tracing::error!("--render-distance requires an unsigned integer"),
                },
                "--frames" => match args.next().map(|v| v.parse::<u64>()) {
                    Some(Ok(value)) => opts.frames = value,
                    _ => tracing::error!("--frames requires an unsigned integer"),
                },
                "--speed" => match args.next().map(|v| v.parse::<f32>()) {
                    Some(Ok(value)) if value.is_finite() && value >= 0.0 => opts.speed = value,
                    _ => tracing::error!("--speed requires a non-negative number"),
                },
                "--heading" => match args.next().map(|v| v.parse::<f32>()) {
                    Some(Ok(value)) if value.is_finite() => opts.heading = value,
                    _ => tracing::error!("--heading requires a number of degrees"),
                },
                "--summary-out" => match args.next() {
                    Some(path) => opts.summary_out = Some(PathBuf::from(path)),
                    None => tracing::error!("--summary-out requires a file path"),
                },
                other => tracing::warn!("Ignoring unknown argument {other}"),
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        let opts = parse(&[]);
        assert!(opts.config.is_none());
        assert!(opts.seed.is_none());
        assert!(!opts.strict);
        assert_eq!(opts.frames, 3600);
        assert_eq!(opts.speed, 40.0);
    }

    #[test]
    fn parses_known_flags() {
        let opts = parse(&[
            "--config", "my.toml", "--strict", "--seed", "7", "--frames", "10", "--heading", "-45",
        ]);
        assert_eq!(opts.config, Some(PathBuf::from("my.toml")));
        assert!(opts.strict);
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.frames, 10);
        assert_eq!(opts.heading, -45.0);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let opts = parse(&["--speed", "-3", "--frames", "lots", "--bogus"]);
        assert_eq!(opts.speed, 40.0);
        assert_eq!(opts.frames, 3600);
    }
}
