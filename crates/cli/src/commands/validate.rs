//! `tof-fuse validate`: parse + validate a station config, plus non-fatal warnings

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{SinkType, StationBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Offending field for validation errors, e.g. `fusion.scale_meters`
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

impl ValidationResult {
    fn invalid(path: &Path, error: String, field: Option<String>) -> Self {
        Self {
            valid: false,
            config_path: path.display().to_string(),
            error: Some(error),
            field,
            warnings: Vec::new(),
            summary: None,
        }
    }

    fn valid(path: &Path, blueprint: &StationBlueprint) -> Self {
        Self {
            valid: true,
            config_path: path.display().to_string(),
            error: None,
            field: None,
            warnings: collect_warnings(blueprint),
            summary: Some(ConfigSummary::from(blueprint)),
        }
    }
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    bind_addr: String,
    rate_hz: f64,
    max_points: usize,
    sink_count: usize,
}

impl From<&StationBlueprint> for ConfigSummary {
    fn from(blueprint: &StationBlueprint) -> Self {
        Self {
            version: format!("{:?}", blueprint.version),
            bind_addr: blueprint.receiver.bind_addr.to_string(),
            rate_hz: blueprint.tick.rate_hz,
            max_points: blueprint.fusion.max_points,
            sink_count: blueprint.sinks.len(),
        }
    }
}

pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "validating configuration");
    let result = validate_config(args);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("cannot serialize validation result")?
        );
    } else {
        print_validation_result(&result);
    }

    anyhow::ensure!(result.valid, "configuration is invalid: {}", args.config.display());
    Ok(())
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let path = args.config.as_path();
    if !path.exists() {
        return ValidationResult::invalid(path, format!("file not found: {}", path.display()), None);
    }

    match config_loader::ConfigLoader::load_from_path(path) {
        Ok(blueprint) => ValidationResult::valid(path, &blueprint),
        Err(e) => ValidationResult::invalid(path, e.to_string(), e.field().map(str::to_string)),
    }
}

/// Legal but probably unintended settings
fn collect_warnings(blueprint: &StationBlueprint) -> Vec<String> {
    let fusion = &blueprint.fusion;
    let has_cloud = blueprint.sinks.iter().any(|s| s.sink_type == SinkType::Cloud);

    let checks = [
        (
            blueprint.sinks.is_empty(),
            "no sinks configured; `run` falls back to a single cloud sink".to_string(),
        ),
        (
            !blueprint.sinks.is_empty() && !has_cloud,
            "no cloud sink configured; fusion.max_points has no effect".to_string(),
        ),
        (
            fusion.orientation_smoothing == 0.0 && !fusion.ignore_orientation,
            "fusion.orientation_smoothing is 0; the direction never leaves its first value"
                .to_string(),
        ),
        (
            fusion.max_distance_jump_meters == 0.0 && fusion.median_window() > 1,
            "fusion.max_distance_jump_meters is 0; most derived points will be rejected"
                .to_string(),
        ),
        (
            blueprint.receiver.bind_addr.ip().is_loopback(),
            format!(
                "receiver binds {}; remote senders cannot reach it",
                blueprint.receiver.bind_addr
            ),
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(hit, message)| hit.then_some(message))
        .collect()
}

fn print_validation_result(result: &ValidationResult) {
    if !result.valid {
        println!("✗ {} is invalid", result.config_path);
        if let Some(error) = &result.error {
            println!("  {error}");
        }
        return;
    }

    println!("✓ {} is valid", result.config_path);
    if let Some(summary) = &result.summary {
        println!(
            "  {} · bind {} · {} Hz · max {} points · {} sink(s)",
            summary.version, summary.bind_addr, summary.rate_hz, summary.max_points, summary.sink_count
        );
    }
    for warning in &result.warnings {
        println!("  ⚠ {warning}");
    }
}
