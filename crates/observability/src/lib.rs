//! # Observability
//!
//! Tracing 订阅器与 Prometheus 导出。
//!
//! 融合、接收、分发各层直接通过 `metrics` 门面打点；本 crate 负责
//! 安装订阅器与导出器，并提供运行结束时的内存聚合 ([`FusionMetricsAggregator`])。
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: Some(9100),
//!     default_log_level: "debug".into(),
//! })?;
//! ```

pub mod metrics;

use std::str::FromStr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub use crate::metrics::{
    record_cloud_size, record_fusion_outcome, record_receiver_silence_ms, record_sink_queue_depth,
    record_tick_duration_ms, FusionMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// TF-Luna 量程内的距离直方图分桶 (米)
const DISTANCE_BUCKETS_M: &[f64] = &[0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 8.0];

/// 时间戳差直方图分桶 (毫秒)，覆盖默认 50 ms 门限两侧
const TIMESTAMP_DELTA_BUCKETS_MS: &[f64] = &[1.0, 5.0, 10.0, 20.0, 35.0, 50.0, 75.0, 100.0, 250.0];

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 不导出)
    pub metrics_port: Option<u16>,
    /// `RUST_LOG` 未设置时使用的过滤指令
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9100),
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    /// 单行
    Compact,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => anyhow::bail!("unknown log format '{other}' (expected json|pretty|compact)"),
        }
    }
}

/// JSON 日志 + 9100 端口导出
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 安装全局订阅器，按需启动 Prometheus 导出
///
/// 进程内只能成功一次；第二次调用返回错误。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_log_level))
        .with_context(|| format!("Invalid log filter '{}'", config.default_log_level))?;

    // 格式层类型固定为 Layer<Registry>，必须最先挂上
    tracing_subscriber::registry()
        .with(format_layer(config.log_format))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "observability initialized"
    );
    Ok(())
}

/// 只启动 Prometheus 导出 (订阅器已由调用方安装)
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn format_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    }
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full("tof_fuse_distance_meters".to_string()),
            DISTANCE_BUCKETS_M,
        )
        .context("Invalid distance histogram buckets")?
        .set_buckets_for_metric(
            Matcher::Full("tof_fuse_timestamp_delta_ms".to_string()),
            TIMESTAMP_DELTA_BUCKETS_MS,
        )
        .context("Invalid timestamp delta histogram buckets")?
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    tracing::info!(port, "prometheus exporter listening");
    Ok(())
}
