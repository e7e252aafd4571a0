//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! The producer side never waits: a full queue drops the record for that sink only.

use std::sync::Arc;

use contracts::{DataSink, SinkRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<SinkRecord>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Worker gone, nothing will be written anymore
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a record (non-blocking)
    ///
    /// Returns false if the queue was full or the worker is gone.
    pub fn try_send(&self, record: SinkRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(record)) => {
                self.metrics.inc_dropped_count();
                metrics::counter!(
                    "tof_fuse_points_dispatched_total",
                    "sink" => self.name.clone(),
                    "status" => "dropped"
                )
                .increment(1);
                warn!(sink = %self.name, seq = ?record.seq(), "queue full, record dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Close the queue, let the worker drain, flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "worker task panicked");
        }
        debug!(sink = %self.name, "sink handle shutdown complete");
    }
}

#[instrument(name = "sink_worker_loop", skip(sink, rx, metrics), fields(sink = %name))]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<SinkRecord>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!("sink worker started");

    while let Some(record) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&record).await {
            Ok(()) => {
                metrics.record_write(record.seq());
                metrics::counter!(
                    "tof_fuse_points_dispatched_total",
                    "sink" => name.clone(),
                    "status" => "ok"
                )
                .increment(1);
            }
            Err(e) => {
                metrics.inc_failure_count();
                metrics::counter!(
                    "tof_fuse_points_dispatched_total",
                    "sink" => name.clone(),
                    "status" => "failed"
                )
                .increment(1);
                // 单条失败不影响后续写入
                error!(seq = ?record.seq(), error = %e, "write failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(error = %e, "flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "close failed on shutdown");
    }

    debug!("sink worker stopped");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use contracts::{
        ContractError, FusedPoint, MarkerFrame, PointRecord, PointSource, Shade, Vector3,
    };
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    pub(crate) fn point_record(seq: u64) -> SinkRecord {
        SinkRecord::Point(PointRecord {
            seq,
            timestamp: seq as f64 * 0.02,
            point: FusedPoint {
                position: Vector3::new(0.1, 0.2, seq as f32),
                distance_meters: seq as f32,
                shade: Shade {
                    t: 0.5,
                    intensity: 1.0,
                },
                source: PointSource::Derived,
            },
        })
    }

    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSink {
        fn new(name: &str, write_count: Arc<AtomicU64>) -> Self {
            Self {
                name: name.to_string(),
                write_count,
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl DataSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _record: &SinkRecord) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let write_count = Arc::new(AtomicU64::new(0));
        let handle = SinkHandle::spawn(MockSink::new("test", write_count.clone()), 10);

        for seq in 1..=5 {
            assert!(handle.try_send(point_record(seq)));
        }
        assert!(handle.try_send(SinkRecord::Markers(MarkerFrame::default())));

        let metrics = handle.metrics().clone();
        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 6);
        assert_eq!(metrics.last_seq(), Some(5));
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let mut sink = MockSink::new("slow", Arc::new(AtomicU64::new(0)));
        sink.delay_ms = 100;
        let handle = SinkHandle::spawn(sink, 2);

        for seq in 1..=10 {
            handle.try_send(point_record(seq));
        }

        assert!(handle.metrics().dropped_count() > 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let mut sink = MockSink::new("failing", Arc::new(AtomicU64::new(0)));
        sink.should_fail = true;
        let handle = SinkHandle::spawn(sink, 10);

        for seq in 1..=3 {
            handle.try_send(point_record(seq));
        }
        sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.metrics().failure_count(), 3);
        assert!(!handle.is_closed());
        handle.shutdown().await;
    }
}
