//! Range/orientation timestamp gate.

/// Whether two sub-record timestamps are close enough to be fused.
///
/// A timestamp <= 0 is unknown and never blocks fusion.
#[inline]
pub fn is_aligned(t1: f64, t2: f64, max_delta: f64) -> bool {
    if t1 <= 0.0 || t2 <= 0.0 {
        return true;
    }
    (t1 - t2).abs() <= max_delta
}

/// Signed delta used for diagnostics, `None` when either side is unknown.
#[inline]
pub fn timestamp_delta(t1: f64, t2: f64) -> Option<f64> {
    (t1 > 0.0 && t2 > 0.0).then(|| t1 - t2)
}
