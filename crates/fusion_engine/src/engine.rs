//! Fusion pipeline - ordered guard chain over one sample at a time.
//!
//! Owns every piece of cross-sample state (calibration, smoothed orientation,
//! distance window). Single-threaded: driven by one consumer.

use contracts::{
    FusedPoint, FusionConfig, LatestSlot, PointSource, Quaternion, RangeReading, RejectionReason,
    Sample, ShadingConfig, Vector3,
};
use tracing::{debug, instrument, trace};

use crate::alignment::{is_aligned, timestamp_delta};
use crate::calibrator::OrientationCalibrator;
use crate::deriver::{derive, derive_absolute, direction};
use crate::median::DistanceFilter;
use crate::shading::shade;
use crate::smoother::OrientationSmoother;

/// Which way an aligned sample becomes a point
enum Branch {
    /// Sender-supplied position, orientation unused
    Absolute(Vector3<f32>),
    /// Smoothed orientation × filtered distance
    Derived(Quaternion<f32>),
}

/// Counters kept by the pipeline itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusionStats {
    pub processed: u64,
    pub accepted_derived: u64,
    pub accepted_absolute: u64,
    rejected: [u64; RejectionReason::ALL.len()],
    pub calibrations: u64,
}

impl FusionStats {
    pub fn accepted(&self) -> u64 {
        self.accepted_derived + self.accepted_absolute
    }

    pub fn rejected(&self, reason: RejectionReason) -> u64 {
        self.rejected[reason_index(reason)]
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected.iter().sum()
    }
}

fn reason_index(reason: RejectionReason) -> usize {
    match reason {
        RejectionReason::Unready => 0,
        RejectionReason::Incomplete => 1,
        RejectionReason::Misaligned => 2,
        RejectionReason::WeakSignal => 3,
        RejectionReason::DistanceJump => 4,
    }
}

/// Result of fusing one fresh sample
#[derive(Debug, Clone, PartialEq)]
pub struct FusionResult {
    /// Slot sequence number of the sample
    pub slot_seq: u64,
    /// Range timestamp (0 when the sample had no range)
    pub timestamp: f64,
    /// Signed range - orientation delta (seconds), `None` when either side is unknown
    pub timestamp_delta: Option<f64>,
    pub outcome: Result<FusedPoint, RejectionReason>,
}

/// What one tick did
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    /// A calibration was requested and captured
    pub calibration_captured: bool,
    /// `None` when the slot held nothing new
    pub fused: Option<FusionResult>,
}

/// Stateful ToF/orientation fusion pipeline
#[derive(Debug)]
pub struct FusionPipeline {
    config: FusionConfig,
    shading: ShadingConfig,
    calibrator: OrientationCalibrator,
    smoother: OrientationSmoother,
    distance_filter: DistanceFilter,
    stats: FusionStats,
}

impl FusionPipeline {
    pub fn new(config: FusionConfig, shading: ShadingConfig) -> Self {
        let distance_filter = DistanceFilter::new(config.median_window());
        Self {
            config,
            shading,
            calibrator: OrientationCalibrator::new(),
            smoother: OrientationSmoother::new(),
            distance_filter,
            stats: FusionStats::default(),
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn stats(&self) -> &FusionStats {
        &self.stats
    }

    pub fn calibrator(&self) -> &OrientationCalibrator {
        &self.calibrator
    }

    pub fn smoother(&self) -> &OrientationSmoother {
        &self.smoother
    }

    pub fn distance_filter(&self) -> &DistanceFilter {
        &self.distance_filter
    }

    /// Capture the sample's raw orientation as the new reference frame.
    ///
    /// Returns `false` (nothing changes) when the sample has no orientation.
    #[instrument(name = "fusion_pipeline_capture_calibration", skip(self, sample))]
    pub fn capture_calibration(&mut self, sample: &Sample) -> bool {
        let Some(orientation) = sample.orientation else {
            debug!("calibration requested without orientation, ignored");
            return false;
        };
        let captured = self.calibrator.capture(orientation.quaternion);
        if captured {
            self.stats.calibrations += 1;
            metrics::counter!("tof_fuse_calibrations_total").increment(1);
        }
        captured
    }

    /// Run one sample through the guard chain.
    ///
    /// Emits exactly one point or one rejection.
    #[instrument(
        level = "trace",
        name = "fusion_pipeline_process",
        skip(self, sample),
        fields(t = sample.distance_timestamp().unwrap_or(0.0))
    )]
    pub fn process(
        &mut self,
        sample: &Sample,
        sink_ready: bool,
    ) -> Result<FusedPoint, RejectionReason> {
        self.stats.processed += 1;
        let result = self.run_guards(sample, sink_ready);
        self.record(&result);
        result
    }

    /// One consumer tick over the latest-sample slot.
    ///
    /// A pending calibration is captured from a fresh snapshot first, then the
    /// slot is read again and fused if it holds a sample not seen before.
    #[instrument(level = "trace", name = "fusion_pipeline_tick", skip(self, slot))]
    pub fn tick(
        &mut self,
        slot: &LatestSlot<Sample>,
        calibrate: bool,
        sink_ready: bool,
    ) -> TickOutcome {
        let calibration_captured =
            calibrate && slot.snapshot().is_some_and(|s| self.capture_calibration(&s));

        let fused = slot.take_fresh().map(|(slot_seq, sample)| FusionResult {
            slot_seq,
            timestamp: sample.distance_timestamp().unwrap_or(0.0),
            timestamp_delta: sample
                .distance_timestamp()
                .zip(sample.orientation_timestamp())
                .and_then(|(t_range, t_orientation)| timestamp_delta(t_range, t_orientation)),
            outcome: self.process(&sample, sink_ready),
        });

        TickOutcome {
            calibration_captured,
            fused,
        }
    }

    /// Clear calibration, smoothing and the distance window
    pub fn reset(&mut self) {
        self.calibrator.reset();
        self.smoother.reset();
        self.distance_filter.clear();
        debug!("fusion pipeline reset");
    }

    fn run_guards(
        &mut self,
        sample: &Sample,
        sink_ready: bool,
    ) -> Result<FusedPoint, RejectionReason> {
        if !sink_ready {
            return Err(RejectionReason::Unready);
        }

        let (Some(range), Some(orientation)) = (sample.range, sample.orientation) else {
            return Err(RejectionReason::Incomplete);
        };

        if let Some(delta) = timestamp_delta(range.timestamp, orientation.timestamp) {
            metrics::histogram!("tof_fuse_timestamp_delta_ms").record(delta.abs() * 1000.0);
        }
        if !is_aligned(
            range.timestamp,
            orientation.timestamp,
            self.config.max_timestamp_delta_seconds,
        ) {
            return Err(RejectionReason::Misaligned);
        }

        // Smoothing advances here, before the strength/jump guards can reject.
        let branch = match sample.absolute_position {
            Some(position) if self.config.use_absolute_position => Branch::Absolute(position),
            _ => {
                let calibrated = self.calibrator.apply(orientation.quaternion);
                Branch::Derived(
                    self.smoother
                        .smooth(calibrated, self.config.orientation_smoothing),
                )
            }
        };

        if range.strength < self.config.min_strength {
            return Err(RejectionReason::WeakSignal);
        }

        match branch {
            Branch::Absolute(position) => Ok(self.absolute_point(position)),
            Branch::Derived(smoothed) => self.derived_point(&range, smoothed),
        }
    }

    fn absolute_point(&self, position: Vector3<f32>) -> FusedPoint {
        let position = derive_absolute(position, self.config.flip_x, self.config.flip_y);
        let distance_meters = position.norm();
        FusedPoint {
            position,
            distance_meters,
            shade: shade(distance_meters, &self.shading),
            source: PointSource::Absolute,
        }
    }

    fn derived_point(
        &mut self,
        range: &RangeReading,
        smoothed: Quaternion<f32>,
    ) -> Result<FusedPoint, RejectionReason> {
        let raw = range.distance_cm * self.config.scale_meters;
        // inf/NaN 不进窗口
        if !raw.is_finite() {
            trace!(raw, "non-finite distance");
            return Err(RejectionReason::DistanceJump);
        }
        let filtered = self.distance_filter.filter(raw);
        if (raw - filtered).abs() > self.config.max_distance_jump_meters {
            trace!(raw, filtered, "distance jump");
            return Err(RejectionReason::DistanceJump);
        }

        let dir = direction(smoothed, self.config.ignore_orientation);
        let position = derive(dir, filtered, self.config.flip_x, self.config.flip_y);
        Ok(FusedPoint {
            position,
            distance_meters: filtered,
            shade: shade(filtered, &self.shading),
            source: PointSource::Derived,
        })
    }

    fn record(&mut self, result: &Result<FusedPoint, RejectionReason>) {
        match result {
            Ok(point) => {
                match point.source {
                    PointSource::Derived => self.stats.accepted_derived += 1,
                    PointSource::Absolute => self.stats.accepted_absolute += 1,
                }
                metrics::counter!(
                    "tof_fuse_points_accepted_total",
                    "source" => point.source.as_str()
                )
                .increment(1);
                metrics::histogram!("tof_fuse_distance_meters").record(point.distance_meters as f64);
                trace!(source = point.source.as_str(), d = point.distance_meters, "point accepted");
            }
            Err(reason) => {
                self.stats.rejected[reason_index(*reason)] += 1;
                metrics::counter!(
                    "tof_fuse_samples_rejected_total",
                    "reason" => reason.as_str()
                )
                .increment(1);
                trace!(%reason, "sample rejected");
            }
        }
    }
}
