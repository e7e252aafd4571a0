//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{FusionConfig, ShadingConfig, StationBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    receiver: ReceiverInfo,
    tick_rate_hz: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    fusion: Option<FusionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shading: Option<ShadingConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct ReceiverInfo {
    bind_addr: String,
    recv_timeout_ms: u64,
    max_datagram_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    trigger_addr: Option<String>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &StationBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        receiver: ReceiverInfo {
            bind_addr: blueprint.receiver.bind_addr.to_string(),
            recv_timeout_ms: blueprint.receiver.recv_timeout_ms,
            max_datagram_size: blueprint.receiver.max_datagram_size,
            trigger_addr: blueprint.receiver.trigger_addr.map(|a| a.to_string()),
        },
        tick_rate_hz: blueprint.tick.rate_hz,
        fusion: args.fusion.then(|| blueprint.fusion.clone()),
        shading: args.fusion.then(|| blueprint.shading.clone()),
        sinks,
    }
}

fn print_config_info(blueprint: &StationBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 tof-fuse Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Receiver info
    let receiver = &blueprint.receiver;
    println!("📡 Receiver");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Bind: {}", receiver.bind_addr);
    println!("   ├─ Receive timeout: {} ms", receiver.recv_timeout_ms);
    println!("   ├─ Max datagram: {} bytes", receiver.max_datagram_size);
    match receiver.trigger_addr {
        Some(addr) => println!("   └─ Calibration trigger: {}", addr),
        None => println!("   └─ Calibration trigger: stdin only"),
    }

    // Fusion
    let fusion = &blueprint.fusion;
    println!("\n⚙️  Fusion ({} Hz)", blueprint.tick.rate_hz);
    if args.fusion {
        println!("   ├─ Scale: {} m/unit", fusion.scale_meters);
        println!("   ├─ Absolute position: {}", fusion.use_absolute_position);
        println!("   ├─ Ignore orientation: {}", fusion.ignore_orientation);
        println!("   ├─ Flip X/Y: {}/{}", fusion.flip_x, fusion.flip_y);
        println!("   ├─ Min strength: {}", fusion.min_strength);
        println!("   ├─ Median window: {}", fusion.median_window());
        println!("   ├─ Smoothing: {}", fusion.orientation_smoothing);
        println!(
            "   ├─ Max timestamp delta: {} s",
            fusion.max_timestamp_delta_seconds
        );
        println!("   ├─ Max distance jump: {} m", fusion.max_distance_jump_meters);
        let shading = &blueprint.shading;
        println!(
            "   ├─ Shading: {}..{} m → intensity {}..{}",
            shading.min_distance_meters,
            shading.max_distance_meters,
            shading.min_intensity,
            shading.max_intensity
        );
    }
    println!("   └─ Max points: {}", fusion.max_points);

    // Sinks
    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue={}) {:?}",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
