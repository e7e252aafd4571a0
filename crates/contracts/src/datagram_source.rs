//! DatagramSource trait - raw message source abstraction
//!
//! Decouples the ingestion pipeline from where datagrams come from: a bound UDP
//! socket, a synthetic generator or a recorded session.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;

/// One complete message as delivered by the transport
#[derive(Debug, Clone)]
pub struct RawDatagram {
    /// Message bytes (one JSON document)
    pub payload: Bytes,

    /// Sender address, when the transport has one
    pub sender: Option<SocketAddr>,
}

impl RawDatagram {
    pub fn new(payload: impl Into<Bytes>, sender: Option<SocketAddr>) -> Self {
        Self {
            payload: payload.into(),
            sender,
        }
    }
}

/// Datagram callback type
///
/// Invoked from the source's own task or thread for every received message.
pub type DatagramCallback = Arc<dyn Fn(RawDatagram) + Send + Sync>;

/// Datagram source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn DatagramSource> = Box::new(UdpDatagramSource::bind(&cfg).await?);
/// source.listen(Arc::new(|datagram| {
///     println!("{} bytes", datagram.payload.len());
/// }));
/// // ...
/// source.stop();
/// ```
pub trait DatagramSource: Send + Sync {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Start delivering datagrams to `callback`.
    ///
    /// Calling it again while listening is a no-op.
    fn listen(&self, callback: DatagramCallback);

    /// Stop delivering. The source's worker exits after its current bounded wait.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
