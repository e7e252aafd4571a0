//! Sink implementations
//!
//! Contains LogSink, FileSink, NetworkSink and CloudSink.

mod cloud;
mod file;
mod log;
mod network;

pub use self::cloud::{CloudSink, CloudView, PointCloud};
pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};
