//! # Ingestion Pipeline
//!
//! Datagram ingestion module.
//!
//! Responsibilities:
//! - Register datagram sources (UDP, Mock and Replay)
//! - Decode JSON datagrams into `Sample` / `MarkerFrame`
//! - Newest-wins handoff to the fusion consumer, no queueing
//! - Receiver diagnostics (counts, last sender, last-seen age)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, UdpDatagramSource};
//!
//! let mut pipeline = IngestionPipeline::new();
//! pipeline.register_source(Box::new(UdpDatagramSource::bind(&blueprint.receiver)?))?;
//! pipeline.start_all();
//!
//! let slot = pipeline.samples();
//! if let Some((seq, sample)) = slot.take_fresh() {
//!     // Fuse sample
//! }
//! ```

pub mod codec;
mod error;
mod mock;
mod pipeline;
mod replay;
mod stats;
mod udp;

// Re-exports
pub use codec::{decode, decode_datagram, encode, encode_markers};
pub use contracts::{Datagram, DecodeError, MarkerFrame, Sample};
pub use error::{IngestionError, Result};
pub use mock::{synthetic_sample, MockDatagramSource, MockSourceConfig};
pub use pipeline::{handle_datagram, IngestionPipeline};
pub use replay::{ReplayConfig, ReplayDatagramSource};
pub use stats::{ReceiverStats, ReceiverStatsSnapshot};
pub use udp::UdpDatagramSource;
