//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::StationBlueprint;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, SourceMode};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args)?;

    // Apply CLI overrides
    if let Some(bind) = args.bind {
        info!(bind = %bind, "Overriding receiver bind address from CLI");
        blueprint.receiver.bind_addr = bind;
    }
    if let Some(trigger) = args.trigger {
        info!(trigger = %trigger, "Overriding calibration trigger address from CLI");
        blueprint.receiver.trigger_addr = Some(trigger);
    }
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid configuration")?;

    info!(
        bind = %blueprint.receiver.bind_addr,
        rate_hz = blueprint.tick.rate_hz,
        max_points = blueprint.fusion.max_points,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let source = if args.mock {
        SourceMode::Mock {
            rate_hz: args.mock_rate,
        }
    } else if let Some(ref path) = args.replay {
        SourceMode::Replay {
            path: path.clone(),
            speed: args.replay_speed,
            loop_playback: args.replay_loop,
        }
    } else {
        SourceMode::Udp
    };

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        source,
        max_points_emitted: (args.max_points_emitted > 0).then_some(args.max_points_emitted),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        stdin_calibration: !args.no_stdin,
    };

    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting pipeline...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        points_emitted = stats.points_emitted,
        datagrams = stats.receiver.datagrams_received,
        duration_secs = stats.duration.as_secs_f64(),
        points_per_second = format!("{:.2}", stats.points_per_second()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("tof-fuse finished");
    Ok(())
}

fn load_blueprint(args: &RunArgs) -> Result<StationBlueprint> {
    match args.config {
        Some(ref path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(StationBlueprint::default())
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &StationBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Receiver:");
    println!("  Bind: {}", blueprint.receiver.bind_addr);
    println!("  Receive timeout: {} ms", blueprint.receiver.recv_timeout_ms);
    if let Some(trigger) = blueprint.receiver.trigger_addr {
        println!("  Calibration trigger: {}", trigger);
    }

    let fusion = &blueprint.fusion;
    println!("\nFusion:");
    println!("  Tick rate: {} Hz", blueprint.tick.rate_hz);
    println!("  Min strength: {}", fusion.min_strength);
    println!("  Median window: {}", fusion.median_window());
    println!("  Smoothing: {}", fusion.orientation_smoothing);
    println!(
        "  Max timestamp delta: {} s",
        fusion.max_timestamp_delta_seconds
    );
    println!("  Max distance jump: {} m", fusion.max_distance_jump_meters);
    println!("  Max points: {}", fusion.max_points);

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
