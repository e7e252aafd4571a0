//! Sample - Ingestion output
//!
//! One decoded ToF + orientation reading, plus the marker frames that share the
//! same transport.

use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Range sub-record (TF-Luna)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeReading {
    /// Source timestamp (seconds); <= 0 means unknown
    pub timestamp: f64,

    /// Raw distance in the sensor's unit (centimeters)
    pub distance_cm: f32,

    /// Signal strength reported by the sensor
    pub strength: i32,

    /// Chip temperature (°C)
    pub temperature_c: f32,
}

/// Orientation sub-record (BNO055)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationReading {
    /// Source timestamp (seconds); <= 0 means unknown
    pub timestamp: f64,

    /// Absolute orientation. Never re-normalized here.
    pub quaternion: Quaternion<f32>,
}

/// Decoded sensor sample
///
/// Immutable once decoded. Either sub-record may be missing when the sender
/// had no reading yet; the fusion pipeline rejects such samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Distance sub-record
    pub range: Option<RangeReading>,

    /// Orientation sub-record
    pub orientation: Option<OrientationReading>,

    /// Position precomputed by the sender (meters)
    pub absolute_position: Option<Vector3<f32>>,
}

impl Sample {
    /// Both sub-records present
    pub fn is_complete(&self) -> bool {
        self.range.is_some() && self.orientation.is_some()
    }

    pub fn distance_timestamp(&self) -> Option<f64> {
        self.range.map(|r| r.timestamp)
    }

    pub fn orientation_timestamp(&self) -> Option<f64> {
        self.orientation.map(|o| o.timestamp)
    }
}

/// A single fiducial anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: i32,
    /// Translation in meters
    pub position: Vector3<f32>,
}

/// Marker-list packet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerFrame {
    pub timestamp: f64,
    pub markers: Vec<Marker>,
}

/// Any message the decoder understands
#[derive(Debug, Clone, PartialEq)]
pub enum Datagram {
    /// Range + orientation reading
    Sample(Sample),
    /// Anchor observations
    Markers(MarkerFrame),
}
