//! # Dispatcher
//!
//! 数据分发模块。
//!
//! 负责：
//! - 接收融合后的点与 marker 帧
//! - Fan-out 到多个 sinks (log / file / network / cloud)
//! - 隔离慢 sink，不阻塞节拍循环

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, SinkRecord};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{
    CloudSink, CloudView, FileSink, FileSinkConfig, LogSink, NetworkFormat, NetworkSink,
    NetworkSinkConfig, PointCloud,
};
