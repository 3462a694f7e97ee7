//! fbcheck - Framebuffer visual validation tool
//!
//! Entry point for the CLI binary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fbcheck::capture::{FileFrameSource, FrameSource};
use fbcheck::config::Config;
use fbcheck::decoder::FramebufferDecoder;
use fbcheck::pipeline::Validator;
use fbcheck::report::Reporter;

/// Command-line arguments for fbcheck
#[derive(Parser, Debug)]
#[command(name = "fbcheck")]
#[command(version, about = "Framebuffer visual validation", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "fbcheck.toml")]
    config: String,

    /// Display width in pixels (overrides config)
    #[arg(long, env = "FBCHECK_WIDTH")]
    width: Option<u32>,

    /// Display height in pixels (overrides config)
    #[arg(long, env = "FBCHECK_HEIGHT")]
    height: Option<u32>,

    /// Source pixel format: auto, rgb565, rgb32, rgba32 (overrides config)
    #[arg(short, long)]
    format: Option<String>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "compact")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one raw framebuffer dump to PNG
    Convert {
        /// Raw framebuffer dump
        input: PathBuf,

        /// Output PNG path
        #[arg(default_value = "framebuffer.png")]
        output: PathBuf,
    },

    /// Compare two raw framebuffer dumps and report a verdict
    ///
    /// Exits 0 when a visual change beyond the threshold was detected,
    /// 1 when the captures are effectively identical.
    Compare {
        /// Capture taken before the interaction
        before: PathBuf,

        /// Capture taken after the interaction
        after: PathBuf,

        /// Per-channel tolerance (overrides config)
        #[arg(long)]
        tolerance: Option<u8>,

        /// Changed-area threshold in percent (overrides config)
        #[arg(long)]
        threshold: Option<f64>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Load config before logging so the configured level can apply; remember
    // the failure and report it once the subscriber is up
    let (config, load_error) = match Config::load(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default_config(), Some(e)),
    };

    if let Err(e) = init_logging(&args, &config) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::from(2);
    }

    if let Some(e) = load_error {
        warn!("Failed to load config: {:#}, using defaults", e);
    }

    match run(args, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args, config: Config) -> Result<ExitCode> {
    let config = config.with_overrides(args.width, args.height, args.format, None, None);

    match args.command {
        Command::Convert { input, output } => {
            config.validate()?;

            let mut source = FileFrameSource::new(&input, config.geometry());
            let raw = source.capture()?;

            let decoder = FramebufferDecoder::new();
            let frame = decoder.decode(&raw, config.format_hint())?;

            frame
                .grid
                .to_rgb_image()
                .save(&output)
                .context(format!("Failed to write image: {}", output.display()))?;

            info!(
                "Screenshot saved: {} ({}, {})",
                output.display(),
                frame.grid.geometry(),
                frame.format
            );

            Ok(ExitCode::SUCCESS)
        }

        Command::Compare {
            before,
            after,
            tolerance,
            threshold,
        } => {
            let config = config.with_overrides(None, None, None, tolerance, threshold);
            config.validate()?;

            let validator = Validator::from_config(&config);
            let mut src_before = FileFrameSource::new(&before, config.geometry());
            let mut src_after = FileFrameSource::new(&after, config.geometry());

            let outcome = validator.run_sources(&mut src_before, &mut src_after)?;

            let reporter = Reporter::new(config.output.clone());
            reporter.save_outcome(&outcome)?;
            reporter.log_verdict(&outcome);

            Ok(if outcome.changed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
    }
}

fn init_logging(args: &Args, config: &Config) -> Result<()> {
    // -v beats the config file; the config level is the quiet default
    let log_level = match args.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("fbcheck={level},warn", level = log_level))
    });

    match args.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
    }

    Ok(())
}
