//! Dispatcher - fan-out of accepted points and marker frames to sinks

use tracing::{debug, info, instrument};

use contracts::{SinkConfig, SinkRecord, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{CloudSink, CloudView, FileSink, LogSink, NetworkSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,

    /// Default retention of cloud sinks
    pub max_points: usize,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Build every sink and spawn its worker
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(sink_count = self.config.sinks.len()))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        if self.config.sinks.is_empty() {
            return Err(DispatcherError::NoSinks);
        }

        let mut dispatcher = Dispatcher::with_handles(Vec::new());
        for sink_config in &self.config.sinks {
            let (handle, cloud) = create_sink_handle(sink_config, self.config.max_points).await?;
            if let Some(view) = cloud {
                dispatcher.clouds.push((sink_config.name.clone(), view));
            }
            dispatcher.handles.push(handle);
        }
        Ok(dispatcher)
    }
}

/// Create a SinkHandle from configuration
///
/// Cloud sinks also hand back their shared view.
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(
    config: &SinkConfig,
    max_points: usize,
) -> Result<(SinkHandle, Option<CloudView>), DispatcherError> {
    match config.sink_type {
        SinkType::Log => Ok((
            SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
            None,
        )),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;
            Ok((SinkHandle::spawn(sink, config.queue_capacity), None))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;
            Ok((SinkHandle::spawn(sink, config.queue_capacity), None))
        }
        SinkType::Cloud => {
            let sink = CloudSink::from_params(&config.name, &config.params, max_points)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;
            let view = sink.view();
            Ok((SinkHandle::spawn(sink, config.queue_capacity), Some(view)))
        }
    }
}

/// Fans records out to every sink without waiting on any of them
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    clouds: Vec<(String, CloudView)>,
    dispatched: u64,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self {
            handles,
            clouds: Vec::new(),
            dispatched: 0,
        }
    }

    /// At least one sink can still receive records
    pub fn is_ready(&self) -> bool {
        self.handles.iter().any(|h| !h.is_closed())
    }

    /// Queue `record` on every sink; returns how many accepted it
    pub fn dispatch(&mut self, record: SinkRecord) -> usize {
        self.dispatched += 1;
        if self.dispatched.is_multiple_of(500) {
            debug!(records = self.dispatched, "dispatcher progress");
        }

        let mut accepted = 0;
        if let Some((last, rest)) = self.handles.split_last() {
            for handle in rest {
                accepted += usize::from(handle.try_send(record.clone()));
            }
            accepted += usize::from(last.try_send(record));
        }
        accepted
    }

    /// Records offered so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Shared view of the cloud sink called `name`
    pub fn cloud(&self, name: &str) -> Option<CloudView> {
        self.clouds
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, view)| view.clone())
    }

    /// All cloud sinks by name
    pub fn clouds(&self) -> &[(String, CloudView)] {
        &self.clouds
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Drain and close every sink, returning the final per-sink metrics
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(self) -> Vec<(String, MetricsSnapshot)> {
        info!(records = self.dispatched, sinks = self.handles.len(), "dispatcher shutting down");
        let mut finals = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let metrics = handle.metrics().clone();
            handle.shutdown().await;
            finals.push((name, metrics.snapshot()));
        }
        info!("dispatcher shutdown complete");
        finals
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    max_points: usize,
) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(DispatcherConfig {
        sinks: sink_configs,
        max_points,
    })
    .build()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::point_record;
    use std::collections::HashMap;

    fn sink_config(name: &str, sink_type: SinkType) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type,
            queue_capacity: 50,
            params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let handles = vec![
            SinkHandle::spawn(LogSink::new("sink1"), 10),
            SinkHandle::spawn(LogSink::new("sink2"), 10),
        ];
        let mut dispatcher = Dispatcher::with_handles(handles);
        assert!(dispatcher.is_ready());

        for seq in 1..=5 {
            assert_eq!(dispatcher.dispatch(point_record(seq)), 2);
        }
        assert_eq!(dispatcher.dispatched(), 5);

        let finals = dispatcher.shutdown().await;
        assert_eq!(finals.len(), 2);
        for (_, snapshot) in finals {
            assert_eq!(snapshot.write_count, 5);
            assert_eq!(snapshot.last_seq, Some(5));
        }
    }

    #[tokio::test]
    async fn test_empty_dispatcher_is_not_ready() {
        let mut dispatcher = Dispatcher::with_handles(Vec::new());
        assert!(!dispatcher.is_ready());
        assert_eq!(dispatcher.dispatch(point_record(1)), 0);
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let configs = vec![
            sink_config("log", SinkType::Log),
            sink_config("cloud", SinkType::Cloud),
        ];
        let mut dispatcher = create_dispatcher(configs, 3).await.unwrap();
        assert_eq!(dispatcher.sink_count(), 2);

        let cloud = dispatcher.cloud("cloud").unwrap();
        for seq in 1..=5 {
            dispatcher.dispatch(point_record(seq));
        }
        dispatcher.shutdown().await;

        // Workers drained before shutdown returned
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.latest().map(|p| p.seq), Some(5));
    }

    #[tokio::test]
    async fn test_no_sinks() {
        assert!(matches!(
            create_dispatcher(Vec::new(), 10).await,
            Err(DispatcherError::NoSinks)
        ));
    }

    #[tokio::test]
    async fn test_bad_network_sink() {
        let configs = vec![sink_config("net", SinkType::Network)];
        let err = match create_dispatcher(configs, 10).await {
            Err(err) => err,
            Ok(_) => panic!("network sink without addr must fail"),
        };
        assert_eq!(err.sink_name(), Some("net"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
