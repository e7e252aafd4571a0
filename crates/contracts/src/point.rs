//! FusedPoint - Fusion Engine output
//!
//! Accepted points, rejection reasons and the records handed to sinks.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::MarkerFrame;

/// Which branch of the pipeline produced a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    /// direction × filtered distance
    Derived,
    /// `pos_m` supplied by the sender
    Absolute,
}

impl PointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Derived => "derived",
            Self::Absolute => "absolute",
        }
    }
}

/// Distance-driven color parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shade {
    /// Normalized distance in [0, 1], used as gradient position
    pub t: f32,
    /// Color intensity multiplier
    pub intensity: f32,
}

/// Accepted 3D point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedPoint {
    /// Position in meters, flips already applied
    pub position: Vector3<f32>,

    /// Distance used for coloring (meters)
    pub distance_meters: f32,

    /// Gradient position and intensity
    pub shade: Shade,

    /// Producing branch
    pub source: PointSource,
}

/// Why the pipeline declined to emit a point
///
/// Normal control flow, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// No sink available to receive points
    Unready,
    /// Range or orientation sub-record missing
    Incomplete,
    /// Sub-record timestamps too far apart
    Misaligned,
    /// Signal strength under threshold
    WeakSignal,
    /// Raw distance diverges from the median
    DistanceJump,
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 5] = [
        Self::Unready,
        Self::Incomplete,
        Self::Misaligned,
        Self::WeakSignal,
        Self::DistanceJump,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unready => "unready",
            Self::Incomplete => "incomplete",
            Self::Misaligned => "misaligned",
            Self::WeakSignal => "weak_signal",
            Self::DistanceJump => "distance_jump",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point with its emission sequence number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Monotonically increasing per run
    pub seq: u64,

    /// Range timestamp of the fused sample (0 when unknown)
    pub timestamp: f64,

    pub point: FusedPoint,
}

/// Item fanned out to sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SinkRecord {
    Point(PointRecord),
    Markers(MarkerFrame),
}

impl SinkRecord {
    /// Sequence number for logging (markers have none)
    pub fn seq(&self) -> Option<u64> {
        match self {
            Self::Point(record) => Some(record.seq),
            Self::Markers(_) => None,
        }
    }
}
