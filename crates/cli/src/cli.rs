//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// tof-fuse - ToF range + IMU orientation point fusion
#[derive(Parser, Debug)]
#[command(
    name = "tof-fuse",
    author,
    version,
    about = "Fuse TF-Luna ranges and BNO055 orientations into a 3D point cloud",
    long_about = "Receives JSON datagrams carrying a ToF range reading and an orientation \n\
                  quaternion, fuses them into 3D points (alignment gate, calibration, \n\
                  smoothing, median filtering) and dispatches the points to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TOF_FUSE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TOF_FUSE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Receive datagrams and run the fusion pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Send synthetic sensor datagrams to a receiver
    Send(SendArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Run(_) => "run",
            Commands::Validate(_) => "validate",
            Commands::Info(_) => "info",
            Commands::Send(_) => "send",
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "TOF_FUSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the UDP listen address
    #[arg(long, env = "TOF_FUSE_BIND")]
    pub bind: Option<SocketAddr>,

    /// Override the calibration trigger address
    #[arg(long, env = "TOF_FUSE_TRIGGER")]
    pub trigger: Option<SocketAddr>,

    /// Generate synthetic datagrams instead of listening on UDP
    #[arg(long, conflicts_with = "replay")]
    pub mock: bool,

    /// Mock datagram rate (Hz)
    #[arg(long, default_value = "50")]
    pub mock_rate: f64,

    /// Replay recorded datagrams from a JSONL file
    #[arg(long, env = "TOF_FUSE_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = original speed)
    #[arg(long, default_value = "1.0")]
    pub replay_speed: f64,

    /// Loop replay when finished
    #[arg(long)]
    pub replay_loop: bool,

    /// Stop after this many points were emitted (0 = unlimited)
    #[arg(long, default_value = "0", env = "TOF_FUSE_MAX_POINTS_EMITTED")]
    pub max_points_emitted: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TOF_FUSE_TIMEOUT")]
    pub timeout: u64,

    /// Do not read calibration requests from stdin
    #[arg(long)]
    pub no_stdin: bool,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TOF_FUSE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "station.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "station.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show fusion and shading parameters
    #[arg(long)]
    pub fusion: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    /// Receiver address
    #[arg(short, long, default_value = "127.0.0.1:5005", env = "TOF_FUSE_SEND_TO")]
    pub to: SocketAddr,

    /// Datagrams per second
    #[arg(long, default_value = "50")]
    pub rate: f64,

    /// Number of datagrams to send (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    pub count: u64,

    /// Base distance (cm)
    #[arg(long, default_value = "150")]
    pub distance_cm: f32,

    /// Include `pos_m` in every datagram
    #[arg(long)]
    pub with_position: bool,

    /// Random seed for the distance noise
    #[arg(long, default_value = "7")]
    pub seed: u64,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
