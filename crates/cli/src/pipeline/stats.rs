//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use fusion_engine::FusionStats;
use ingestion::ReceiverStatsSnapshot;
use observability::FusionMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Points handed to the dispatcher
    pub points_emitted: u64,

    /// Marker frames handed to the dispatcher
    pub marker_frames: u64,

    /// Consumer ticks executed
    pub ticks: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Datagram source description (udp / mock / replay)
    pub source: String,

    /// Number of sinks configured
    pub active_sinks: usize,

    /// Receiver counters at shutdown
    pub receiver: ReceiverStatsSnapshot,

    /// Fusion pipeline counters at shutdown
    pub fusion: FusionStats,

    /// Fusion metrics aggregator
    pub fusion_metrics: FusionMetricsAggregator,

    /// Per-sink delivery counters
    pub sinks: Vec<(String, MetricsSnapshot)>,

    /// Point-cloud sink sizes at shutdown
    pub clouds: Vec<(String, usize)>,
}

impl PipelineStats {
    /// Emitted points per second
    pub fn points_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.points_emitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received datagrams that failed to decode, as percentage
    pub fn malformed_rate(&self) -> f64 {
        if self.receiver.datagrams_received > 0 {
            self.receiver.malformed as f64 / self.receiver.datagrams_received as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Source: {}", self.source);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Points emitted: {}", self.points_emitted);
        println!("   ├─ Points/s: {:.2}", self.points_per_second());
        println!("   ├─ Marker frames: {}", self.marker_frames);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\n📡 Receiver");
        println!("   ├─ Datagrams: {}", self.receiver.datagrams_received);
        println!(
            "   ├─ Malformed: {} ({:.2}%)",
            self.receiver.malformed,
            self.malformed_rate()
        );
        println!("   ├─ Samples published: {}", self.receiver.samples_published);
        println!("   ├─ Samples superseded: {}", self.receiver.samples_superseded);
        match self.receiver.last_sender {
            Some(sender) => println!("   ├─ Last sender: {}", sender),
            None => println!("   ├─ Last sender: -"),
        }
        println!("   └─ Last seen: {}", self.receiver.last_seen_display());

        let summary = self.fusion_metrics.summary();

        println!("\n📈 Fusion");
        println!("   ├─ Samples processed: {}", self.fusion.processed);
        println!(
            "   ├─ Accepted: {} ({:.2}%) [derived={}, absolute={}]",
            self.fusion.accepted(),
            summary.acceptance_rate,
            self.fusion.accepted_derived,
            self.fusion.accepted_absolute
        );
        println!("   ├─ Rejected: {}", self.fusion.rejected_total());
        println!("   ├─ Calibrations: {}", self.fusion.calibrations);
        println!("   ├─ Distance (m): {}", summary.distance_m);
        println!("   ├─ Timestamp delta (ms): {}", summary.timestamp_delta_ms);
        println!("   └─ Tick duration (ms): {}", summary.tick_ms);

        if !summary.rejection_counts.is_empty() {
            println!("\n⚠️  Rejections");
            for (reason, count) in &summary.rejection_counts {
                println!("   ├─ {}: {}", reason, count);
            }
        }

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            for (name, snapshot) in &self.sinks {
                let last_seq = snapshot
                    .last_seq
                    .map_or_else(|| "-".to_string(), |seq| seq.to_string());
                println!(
                    "   ├─ {}: {}/{} written, failed={}, dropped={}, last seq={}",
                    name,
                    snapshot.write_count,
                    snapshot.offered(),
                    snapshot.failure_count,
                    snapshot.dropped_count,
                    last_seq
                );
            }
            for (name, points) in &self.clouds {
                println!("   ├─ {} cloud: {} points", name, points);
            }
        }

        println!();
    }
}
