//! Ingestion Pipeline main entry
//!
//! Every registered source feeds the same decode step; decoded samples and
//! marker frames land in their own newest-wins slot.

use std::sync::Arc;

use contracts::{
    Datagram, DatagramCallback, DatagramSource, LatestSlot, MarkerFrame, RawDatagram, Sample,
};
use tracing::{debug, info, instrument, trace};

use crate::codec;
use crate::error::{IngestionError, Result};
use crate::stats::ReceiverStats;

/// Ingestion Pipeline
///
/// Owns the producer side of the latest-sample handoff.
pub struct IngestionPipeline {
    sources: Vec<Box<dyn DatagramSource>>,
    samples: Arc<LatestSlot<Sample>>,
    markers: Arc<LatestSlot<MarkerFrame>>,
    stats: Arc<ReceiverStats>,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionPipeline {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            samples: Arc::new(LatestSlot::new()),
            markers: Arc::new(LatestSlot::new()),
            stats: Arc::new(ReceiverStats::new()),
        }
    }

    /// Register a datagram source
    ///
    /// A source that is already listening would bypass the decode step and is rejected.
    #[instrument(name = "ingestion_register_source", skip(self, source), fields(source = %source.name()))]
    pub fn register_source(&mut self, source: Box<dyn DatagramSource>) -> Result<()> {
        if source.is_listening() {
            return Err(IngestionError::AlreadyListening {
                source_name: source.name().to_string(),
            });
        }
        debug!("registered datagram source");
        self.sources.push(source);
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting all datagram sources");
        for source in &self.sources {
            if !source.is_listening() {
                debug!(source = %source.name(), "starting source");
                source.listen(self.callback());
            }
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        for source in &self.sources {
            if source.is_listening() {
                debug!(source = %source.name(), "stopping source");
                source.stop();
            }
        }
    }

    /// Callback that decodes into this pipeline's slots
    pub fn callback(&self) -> DatagramCallback {
        let samples = self.samples.clone();
        let markers = self.markers.clone();
        let stats = self.stats.clone();
        Arc::new(move |datagram: RawDatagram| {
            handle_datagram(&datagram, &samples, &markers, &stats);
        })
    }

    /// Latest-sample slot (consumer side)
    pub fn samples(&self) -> Arc<LatestSlot<Sample>> {
        self.samples.clone()
    }

    /// Latest marker frame slot
    pub fn markers(&self) -> Arc<LatestSlot<MarkerFrame>> {
        self.markers.clone()
    }

    pub fn stats(&self) -> Arc<ReceiverStats> {
        self.stats.clone()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Any source still delivering
    pub fn any_listening(&self) -> bool {
        self.sources.iter().any(|s| s.is_listening())
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Decode one datagram and publish the result.
///
/// Malformed datagrams are counted and dropped; no slot is touched.
pub fn handle_datagram(
    datagram: &RawDatagram,
    samples: &LatestSlot<Sample>,
    markers: &LatestSlot<MarkerFrame>,
    stats: &ReceiverStats,
) {
    stats.record_datagram(datagram.sender);

    match codec::decode_datagram(&datagram.payload) {
        Ok(Datagram::Sample(sample)) => {
            let superseded = samples.publish(sample);
            stats.record_sample(superseded);
            trace!(superseded, "sample published");
        }
        Ok(Datagram::Markers(frame)) => {
            trace!(markers = frame.markers.len(), "marker frame published");
            markers.publish(frame);
            stats.record_markers();
        }
        Err(e) => {
            stats.record_malformed();
            debug!(error = %e, sender = ?datagram.sender, "dropping malformed datagram");
        }
    }
}
