//! Receiver diagnostics

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Receiver counters shared between the source callback and readers
#[derive(Debug, Default)]
pub struct ReceiverStats {
    /// Datagrams delivered by any source
    pub datagrams_received: AtomicU64,

    /// Datagrams that failed to decode
    pub malformed: AtomicU64,

    /// Samples written to the latest-sample slot
    pub samples_published: AtomicU64,

    /// Samples replaced before the consumer read them
    pub samples_superseded: AtomicU64,

    /// Marker frames written to the marker slot
    pub marker_frames: AtomicU64,

    last_seen: Mutex<LastSeen>,
}

#[derive(Debug, Default)]
struct LastSeen {
    at: Option<Instant>,
    sender: Option<SocketAddr>,
}

impl ReceiverStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one incoming datagram
    pub fn record_datagram(&self, sender: Option<SocketAddr>) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("tof_fuse_datagrams_received_total").increment(1);

        let mut last = self.last_seen.lock();
        last.at = Some(Instant::now());
        if sender.is_some() {
            last.sender = sender;
        }
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("tof_fuse_datagrams_malformed_total").increment(1);
    }

    pub fn record_sample(&self, superseded: bool) {
        self.samples_published.fetch_add(1, Ordering::Relaxed);
        if superseded {
            self.samples_superseded.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("tof_fuse_samples_superseded_total").increment(1);
        }
    }

    pub fn record_markers(&self) {
        self.marker_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the last datagram, `None` if nothing arrived yet
    pub fn last_seen_age(&self) -> Option<Duration> {
        self.last_seen.lock().at.map(|at| at.elapsed())
    }

    pub fn last_sender(&self) -> Option<SocketAddr> {
        self.last_seen.lock().sender
    }

    /// Get snapshot
    pub fn snapshot(&self) -> ReceiverStatsSnapshot {
        let last = self.last_seen.lock();
        ReceiverStatsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            samples_published: self.samples_published.load(Ordering::Relaxed),
            samples_superseded: self.samples_superseded.load(Ordering::Relaxed),
            marker_frames: self.marker_frames.load(Ordering::Relaxed),
            last_seen_age: last.at.map(|at| at.elapsed()),
            last_sender: last.sender,
        }
    }
}

/// Point-in-time copy of [`ReceiverStats`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverStatsSnapshot {
    pub datagrams_received: u64,
    pub malformed: u64,
    pub samples_published: u64,
    pub samples_superseded: u64,
    pub marker_frames: u64,
    pub last_seen_age: Option<Duration>,
    pub last_sender: Option<SocketAddr>,
}

impl ReceiverStatsSnapshot {
    /// "never" or seconds with two decimals
    pub fn last_seen_display(&self) -> String {
        match self.last_seen_age {
            Some(age) => format!("{:.2}s", age.as_secs_f64()),
            None => "never".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stats() {
        let stats = ReceiverStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.datagrams_received, 0);
        assert_eq!(snap.last_seen_age, None);
        assert_eq!(snap.last_seen_display(), "never");
    }

    #[test]
    fn test_last_sender_kept_when_unknown() {
        let stats = ReceiverStats::new();
        let addr: SocketAddr = "192.168.1.20:40000".parse().unwrap();
        stats.record_datagram(Some(addr));
        // Replay datagrams carry no sender
        stats.record_datagram(None);

        let snap = stats.snapshot();
        assert_eq!(snap.datagrams_received, 2);
        assert_eq!(snap.last_sender, Some(addr));
        assert!(snap.last_seen_age.is_some());
    }

    #[test]
    fn test_superseded_counts() {
        let stats = ReceiverStats::new();
        stats.record_sample(false);
        stats.record_sample(true);
        stats.record_malformed();
        let snap = stats.snapshot();
        assert_eq!(snap.samples_published, 2);
        assert_eq!(snap.samples_superseded, 1);
        assert_eq!(snap.malformed, 1);
    }
}
