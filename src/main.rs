use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use compilation_engine::{
    clip::{ClipManifest, VideoType},
    composition::{CompilationEngine, DurationBudgeter},
    config::Config,
    media::MediaProber,
};

#[derive(Parser)]
#[command(
    name = "compilation-engine",
    version,
    about = "Turn image and GIF clips with narration into compilation videos",
    long_about = "Compilation-Engine selects clips from a manifest, renders each one with flanking gaps through ffmpeg, and joins them into a long-form (16:9) or short-form (9:16) compilation."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render compilations from a clip manifest
    Compile {
        /// Clip manifest (TOML)
        #[arg(long)]
        clips: PathBuf,

        /// Video types to render (regular, shorts); all when omitted
        #[arg(short = 't', long = "type")]
        types: Vec<VideoType>,

        /// Override the configured output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Mark used clips as consumed and save the manifest
        #[arg(long)]
        write_back: bool,
    },

    /// Report how much usable content the manifest holds per video type
    Budget {
        /// Clip manifest (TOML)
        #[arg(long)]
        clips: PathBuf,
    },

    /// Write the default configuration to a file
    InitConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins when set
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    info!("Starting Compilation-Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    match cli.command {
        Command::Compile { clips, types, output_dir, write_back } => {
            compile(config, clips, types, output_dir, write_back).await
        }
        Command::Budget { clips } => budget(config, clips).await,
        Command::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            info!("Default configuration written to {:?}", path);
            Ok(())
        }
    }
}

async fn compile(
    mut config: Config,
    manifest_path: PathBuf,
    types: Vec<VideoType>,
    output_dir: Option<PathBuf>,
    write_back: bool,
) -> Result<()> {
    if let Some(dir) = output_dir {
        config.output.directory = dir;
    }

    let mut manifest = ClipManifest::load(&manifest_path)
        .with_context(|| format!("loading clip manifest {:?}", manifest_path))?;
    let resolved = manifest.resolve_durations(&MediaProber::from_config(&config)).await;
    info!("Loaded {} clips ({} durations probed)", manifest.clips.len(), resolved);

    let types = if types.is_empty() { VideoType::ALL.to_vec() } else { types };
    let engine = CompilationEngine::new(config);

    // Independent runs, each with its own scratch directory
    let handles: Vec<_> = types
        .into_iter()
        .map(|video_type| {
            let engine = engine.clone();
            let clips = manifest.available_for(video_type);
            tokio::spawn(async move { engine.compile(&clips, video_type).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.context("compilation task failed")?);
    }

    let mut failed = 0;
    for result in &results {
        println!("{}", toml::to_string_pretty(result)?);
        if result.success {
            if write_back {
                manifest.mark_consumed(&result.used_clip_ids, result.video_type)?;
            }
            if !result.unrendered_clip_ids.is_empty() {
                warn!(
                    "{} clips were consumed without content in the {} video: {:?}",
                    result.unrendered_clip_ids.len(),
                    result.video_type,
                    result.unrendered_clip_ids
                );
            }
        } else {
            failed += 1;
        }
    }

    if write_back {
        manifest.save(&manifest_path)?;
        info!("Updated clip manifest {:?}", manifest_path);
    }

    if failed > 0 {
        anyhow::bail!("{} of {} compilations failed", failed, results.len());
    }
    Ok(())
}

async fn budget(config: Config, manifest_path: PathBuf) -> Result<()> {
    let manifest = ClipManifest::load(&manifest_path)
        .with_context(|| format!("loading clip manifest {:?}", manifest_path))?;

    let budgeter = DurationBudgeter::new(MediaProber::from_config(&config));
    for report in budgeter.report_all(&manifest.clips).await {
        println!(
            "{:<8} {:>7.1}s of {:.0}-{:.0}s  {:>5.1}%  {} clips  {}",
            report.video_type.to_string(),
            report.current_duration,
            report.min_duration,
            report.max_duration,
            report.progress_percent,
            report.available_clips,
            if report.can_generate { "ready" } else { "not ready" }
        );
    }
    Ok(())
}
