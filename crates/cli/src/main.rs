//! # tof-fuse CLI
//!
//! 命令行入口：接收、融合、分发的节拍编排，
//! 手动校准触发 (stdin / UDP) 以及 Ctrl+C/SIGTERM 优雅退出。

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_send, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), command = cli.command.name(), "tof-fuse starting");

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Send(args) => run_send(args).await,
    };

    if let Err(e) = &result {
        error!(error = %e, command = cli.command.name(), "command failed");
    }
    result
}

/// Map `-v`/`-q`/`--log-format` onto the shared tracing setup.
///
/// `RUST_LOG` still wins over the level picked here. The Prometheus
/// exporter is left to `run --metrics-port`.
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_with_config(logging_config(cli))
}

fn logging_config(cli: &Cli) -> ObservabilityConfig {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    ObservabilityConfig {
        log_format: match cli.log_format {
            cli::LogFormat::Json => observability::LogFormat::Json,
            cli::LogFormat::Pretty => observability::LogFormat::Pretty,
            cli::LogFormat::Compact => observability::LogFormat::Compact,
        },
        metrics_port: None,
        default_log_level: level.to_string(),
    }
}
