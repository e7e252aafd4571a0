//! Pipeline orchestrator - coordinates all components.
//!
//! One datagram source (UDP, mock or replay) publishes into the newest-wins
//! slots; a fixed-rate tick loop drives the fusion pipeline and hands accepted
//! points and marker frames to the dispatcher.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{DatagramSource, PointRecord, SinkRecord, StationBlueprint};
use dispatcher::Dispatcher;
use fusion_engine::FusionPipeline;
use ingestion::{
    IngestionPipeline, MockDatagramSource, MockSourceConfig, ReplayConfig, ReplayDatagramSource,
    UdpDatagramSource,
};
use observability::{
    record_cloud_size, record_fusion_outcome, record_receiver_silence_ms,
    record_sink_queue_depth, record_tick_duration_ms, FusionMetricsAggregator,
};
use tracing::{debug, info, warn};

use super::{CalibrationTrigger, PipelineStats};
use crate::error::CliError;

/// Where datagrams come from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMode {
    /// Listen on `receiver.bind_addr`
    Udp,
    /// Synthetic sweeping sensor
    Mock { rate_hz: f64 },
    /// Recorded JSONL session
    Replay {
        path: PathBuf,
        speed: f64,
        loop_playback: bool,
    },
}

impl SourceMode {
    fn describe(&self, blueprint: &StationBlueprint) -> String {
        match self {
            Self::Udp => format!("udp {}", blueprint.receiver.bind_addr),
            Self::Mock { rate_hz } => format!("mock {:.1} Hz", rate_hz),
            Self::Replay { path, speed, .. } => {
                format!("replay {} (x{:.2})", path.display(), speed)
            }
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The station blueprint configuration
    pub blueprint: StationBlueprint,

    /// Datagram source
    pub source: SourceMode,

    /// Maximum number of points to emit (None = unlimited)
    pub max_points_emitted: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Read calibration requests from stdin
    pub stdin_calibration: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    trigger: CalibrationTrigger,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            trigger: CalibrationTrigger::new(),
        }
    }

    /// Handle for requesting a calibration from outside the tick loop
    pub fn calibration_trigger(&self) -> CalibrationTrigger {
        self.trigger.clone()
    }

    /// Run the pipeline until `shutdown` resolves, the source finishes, or a limit is hit
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let mut sinks = blueprint.sinks.clone();
        if sinks.is_empty() {
            warn!("No sinks configured - using the default in-memory point cloud");
            sinks = StationBlueprint::default().sinks;
        }
        let active_sinks = sinks.len();
        let mut dispatcher = dispatcher::create_dispatcher(sinks, blueprint.fusion.max_points)
            .await
            .map_err(CliError::from)?;
        info!(active_sinks, "Dispatcher started");

        // Setup Ingestion
        info!("Setting up ingestion pipeline...");
        let mut ingestion = IngestionPipeline::new();
        ingestion
            .register_source(self.build_source()?)
            .context("Failed to register datagram source")?;

        // Calibration triggers
        let mut listeners = Vec::new();
        if self.config.stdin_calibration {
            listeners.push(self.trigger.spawn_stdin_listener());
            info!("Press Enter (or 'c' + Enter) to capture calibration");
        }
        if let Some(addr) = blueprint.receiver.trigger_addr {
            let (_, handle) = self.trigger.spawn_udp_listener(addr).await?;
            listeners.push(handle);
        }

        let source_desc = self.config.source.describe(blueprint);
        info!(source = %source_desc, "Starting datagram ingestion...");
        ingestion.start_all();

        let mut stats = PipelineStats {
            source: source_desc,
            active_sinks,
            ..Default::default()
        };
        let mut fusion = FusionPipeline::new(blueprint.fusion.clone(), blueprint.shading.clone());

        self.tick_loop(&ingestion, &mut fusion, &mut dispatcher, &mut stats, shutdown)
            .await;

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        for listener in listeners {
            listener.abort();
        }

        stats.receiver = ingestion.stats().snapshot();
        stats.fusion = fusion.stats().clone();
        let clouds = dispatcher.clouds().to_vec();

        // Wait for sinks to flush
        match tokio::time::timeout(Duration::from_secs(5), dispatcher.shutdown()).await {
            Ok(finals) => stats.sinks = finals,
            Err(_) => warn!("Timed out waiting for sinks to flush"),
        }
        stats.clouds = clouds
            .into_iter()
            .map(|(name, view)| (name, view.len()))
            .collect();

        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            points_per_second = format!("{:.2}", stats.points_per_second()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    fn build_source(&self) -> Result<Box<dyn DatagramSource>> {
        let source: Box<dyn DatagramSource> = match &self.config.source {
            SourceMode::Udp => {
                let source = UdpDatagramSource::bind(&self.config.blueprint.receiver)
                    .map_err(|e| CliError::source_setup("udp", e))?;
                info!(addr = %source.local_addr(), "UDP receiver bound");
                Box::new(source)
            }
            SourceMode::Mock { rate_hz } => {
                info!(rate_hz, "Running in MOCK mode (no sensor required)");
                Box::new(MockDatagramSource::new(MockSourceConfig {
                    rate_hz: *rate_hz,
                    ..Default::default()
                }))
            }
            SourceMode::Replay {
                path,
                speed,
                loop_playback,
            } => {
                let source = ReplayDatagramSource::load(
                    path,
                    ReplayConfig {
                        speed_multiplier: *speed,
                        loop_playback: *loop_playback,
                    },
                )
                .map_err(|e| CliError::source_setup("replay", e))?;
                info!(
                    path = %path.display(),
                    records = source.len(),
                    duration_s = format!("{:.2}", source.duration_s()),
                    "Running in REPLAY mode"
                );
                Box::new(source)
            }
        };
        Ok(source)
    }

    async fn tick_loop(
        &self,
        ingestion: &IngestionPipeline,
        fusion: &mut FusionPipeline,
        dispatcher: &mut Dispatcher,
        stats: &mut PipelineStats,
        shutdown: impl Future<Output = ()>,
    ) {
        let blueprint = &self.config.blueprint;
        let samples = ingestion.samples();
        let markers = ingestion.markers();
        let receiver_stats = ingestion.stats();

        let period = Duration::from_secs_f64(1.0 / blueprint.tick.rate_hz);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let report_every = blueprint.tick.rate_hz.ceil().max(1.0) as u64;

        let deadline = self.config.timeout.map(|t| tokio::time::Instant::now() + t);
        let max_points = self.config.max_points_emitted;
        let mut aggregator = FusionMetricsAggregator::new();
        let mut source_finished = false;

        tokio::pin!(shutdown);

        info!(
            rate_hz = blueprint.tick.rate_hz,
            max_points_emitted = ?max_points,
            "Pipeline running"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    break;
                }
                _ = sleep_until(deadline) => {
                    warn!(timeout_secs = ?self.config.timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    break;
                }
            }

            let tick_start = Instant::now();
            stats.ticks += 1;

            let calibrate = self.trigger.take();
            let outcome = fusion.tick(&samples, calibrate, dispatcher.is_ready());

            if outcome.calibration_captured {
                aggregator.record_calibration();
                info!("Calibration captured");
            } else if calibrate {
                warn!("Calibration requested but no orientation available yet");
            }

            if let Some(result) = outcome.fused {
                record_fusion_outcome(&result.outcome, result.slot_seq);
                aggregator.update(&result.outcome);
                if let Some(delta) = result.timestamp_delta {
                    aggregator.record_timestamp_delta(delta);
                }

                match result.outcome {
                    Ok(point) => {
                        stats.points_emitted += 1;
                        dispatcher.dispatch(SinkRecord::Point(PointRecord {
                            seq: stats.points_emitted,
                            timestamp: result.timestamp,
                            point,
                        }));
                    }
                    Err(reason) => {
                        debug!(slot_seq = result.slot_seq, %reason, "sample rejected");
                    }
                }
            }

            if let Some((_, frame)) = markers.take_fresh() {
                stats.marker_frames += 1;
                dispatcher.dispatch(SinkRecord::Markers(frame));
            }

            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
            aggregator.record_tick(tick_ms);
            record_tick_duration_ms(tick_ms);

            if stats.ticks.is_multiple_of(report_every) {
                report(&receiver_stats, dispatcher, stats);
            }

            if let Some(max) = max_points {
                if stats.points_emitted >= max {
                    info!(points = stats.points_emitted, "Reached max points limit");
                    break;
                }
            }

            // One more tick after the source stops picks up its last sample.
            if source_finished {
                info!("Datagram source finished");
                break;
            }
            source_finished = !ingestion.any_listening();
        }

        stats.fusion_metrics = aggregator;
    }
}

/// Periodic gauges and a debug heartbeat
fn report(
    receiver_stats: &ingestion::ReceiverStats,
    dispatcher: &Dispatcher,
    stats: &PipelineStats,
) {
    if let Some(age) = receiver_stats.last_seen_age() {
        record_receiver_silence_ms(age.as_secs_f64() * 1000.0);
    }
    for (name, snapshot) in dispatcher.metrics() {
        record_sink_queue_depth(&name, snapshot.queue_len);
    }
    for (name, view) in dispatcher.clouds() {
        record_cloud_size(name, view.len());
    }

    let snapshot = receiver_stats.snapshot();
    debug!(
        ticks = stats.ticks,
        points = stats.points_emitted,
        datagrams = snapshot.datagrams_received,
        malformed = snapshot.malformed,
        last_seen = %snapshot.last_seen_display(),
        "pipeline heartbeat"
    );
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
