//! redub - segment-aligned video dubbing pipeline
//!
//! Command line entry point: runs or resumes the pipeline, reports manifest
//! status and writes default configuration files.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use redub::cli::{Args, Commands};
use redub::config::Config;
use redub::error::DubError;
use redub::manifest;
use redub::pipeline::{Orchestrator, Providers};
use redub::stage::Stage;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("redub.toml").exists() {
                Config::from_file("redub.toml")?
            } else {
                Config::default()
            }
        }
    };

    setup_logging(args.verbose, &config.paths.work_dir)?;
    info!("Starting redub");

    let manifest_path = args.manifest.clone().unwrap_or_else(|| config.manifest_path());

    match args.command {
        Commands::Run {
            from_stage,
            to_stage,
            input,
            target_lang,
        } => {
            let from = parse_stage(&from_stage)?;
            let until = match to_stage {
                Some(stage) => parse_stage(&stage)?,
                None => Stage::Package,
            };
            if let Some(input) = input {
                config.paths.input_video = input;
            }
            if let Some(lang) = target_lang {
                config.translate.target_language = lang;
            }
            config.validate()?;

            let providers = Providers::from_config(&config)?;
            let orchestrator = Orchestrator::new(config, providers).with_manifest_path(&manifest_path);
            let summary = orchestrator.run_between(from, until).await?;

            info!(
                "Completed stages: {}",
                summary
                    .stages_run
                    .iter()
                    .map(Stage::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            for (stage, ids) in &summary.failed_segments {
                warn!("{}: {} failed segment(s) {:?}", stage, ids.len(), ids);
            }
            if let Some(video) = &summary.final_video {
                println!("Dubbed video: {}", video.display());
            }
            if let Some(durations) = &summary.durations {
                println!(
                    "Video {:.3}s / audio {:.3}s, drift {:.3}s ({})",
                    durations.video_duration,
                    durations.audio_duration,
                    durations.absolute_difference,
                    if durations.is_within_tolerance() { "ok" } else { "exceeds tolerance" }
                );
            }
        }
        Commands::Status => {
            print_status(&manifest_path)?;
        }
        Commands::Check => {
            let providers = Providers::from_config(&config)?;
            providers.media.check_availability().await?;
            providers.translator.check_availability().await?;
            providers.synthesizer.check_availability().await?;
            println!("All external tools and services are available");
        }
        Commands::InitConfig { path } => {
            if path.exists() {
                return Err(DubError::Config(format!(
                    "{} already exists; refusing to overwrite",
                    path.display()
                ))
                .into());
            }
            Config::default().save_to_file(&path)?;
            println!("Default configuration written to {}", path.display());
        }
    }

    Ok(())
}

fn print_status(manifest_path: &Path) -> Result<()> {
    let manifest = manifest::load(manifest_path)?;

    println!("Manifest: {}", manifest_path.display());
    println!("Run:      {} (created {})", manifest.run_id, manifest.created_at);
    println!("Source:   {}", manifest.source.video.display());
    println!(
        "Language: detected {}, text {}, target {}",
        manifest.detected_language, manifest.source_language, manifest.target_language
    );
    println!("Segments: {}", manifest.segments.len());
    println!();
    println!("{:<14} {:<10} {:<22} {:<10}", "Stage", "Status", "Completed", "Failed");
    println!("{}", "-".repeat(60));

    for stage in Stage::ALL {
        match manifest.stages.get(&stage) {
            Some(record) => println!(
                "{:<14} {:<10} {:<22} {:<10}",
                stage.as_str(),
                "done",
                record.completed_at.format("%Y-%m-%d %H:%M:%S"),
                if record.failed_segments.is_empty() {
                    "-".to_string()
                } else {
                    format!("{:?}", record.failed_segments)
                }
            ),
            None => println!("{:<14} {:<10}", stage.as_str(), "pending"),
        }
    }
    Ok(())
}

/// Parse a stage name from the command line
fn parse_stage(name: &str) -> Result<Stage> {
    name.parse::<Stage>()
        .map_err(|e| DubError::Config(e).into())
}

fn setup_logging(verbose: bool, work_dir: &Path) -> Result<()> {
    let log_dir = work_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "redub.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("redub.log").display()
    );
    Ok(())
}
