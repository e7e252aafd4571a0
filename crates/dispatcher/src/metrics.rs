//! Per-sink counters, shared between a [`SinkHandle`](crate::SinkHandle) and its worker

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};

#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    /// Highest point seq written; 0 until the first point
    last_seq: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records waiting in the sink queue at the last observation
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Relaxed);
    }

    /// A record reached the sink; marker frames carry no `seq`
    pub fn record_write(&self, seq: Option<u64>) {
        self.written.fetch_add(1, Relaxed);
        if let Some(seq) = seq {
            self.last_seq.fetch_max(seq, Relaxed);
        }
    }

    pub fn inc_failure_count(&self) {
        self.failed.fetch_add(1, Relaxed);
    }

    /// Queue full or worker gone
    pub fn inc_dropped_count(&self) {
        self.dropped.fetch_add(1, Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.written.load(Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failed.load(Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Relaxed)
    }

    pub fn last_seq(&self) -> Option<u64> {
        match self.last_seq.load(Relaxed) {
            0 => None,
            seq => Some(seq),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            last_seq: self.last_seq(),
        }
    }
}

/// Point-in-time copy used by the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub last_seq: Option<u64>,
}

impl MetricsSnapshot {
    /// Records offered to the sink, whatever became of them
    pub fn offered(&self) -> u64 {
        self.write_count + self.failure_count + self.dropped_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_seq_is_monotonic() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.last_seq(), None);

        metrics.record_write(Some(5));
        metrics.record_write(None);
        metrics.record_write(Some(3));

        let snap = metrics.snapshot();
        assert_eq!(snap.write_count, 3);
        assert_eq!(snap.last_seq, Some(5));
    }

    #[test]
    fn test_offered_counts_every_outcome() {
        let metrics = SinkMetrics::new();
        metrics.record_write(Some(1));
        metrics.inc_failure_count();
        metrics.inc_dropped_count();
        metrics.inc_dropped_count();
        assert_eq!(metrics.snapshot().offered(), 4);
    }
}
