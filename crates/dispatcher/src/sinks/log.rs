//! LogSink - logs each record via tracing

use contracts::{ContractError, DataSink, SinkRecord};
use tracing::{info, instrument};

/// Sink that logs accepted points and marker frames
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_record(&self, record: &SinkRecord) {
        match record {
            SinkRecord::Point(p) => info!(
                sink = %self.name,
                seq = p.seq,
                t = p.timestamp,
                x = p.point.position.x,
                y = p.point.position.y,
                z = p.point.position.z,
                distance_m = p.point.distance_meters,
                source = p.point.source.as_str(),
                "point"
            ),
            SinkRecord::Markers(frame) => {
                let ids: Vec<i32> = frame.markers.iter().map(|m| m.id).collect();
                info!(sink = %self.name, t = frame.timestamp, ?ids, "markers");
            }
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_write", skip(self, record), fields(sink = %self.name))]
    async fn write(&mut self, record: &SinkRecord) -> Result<(), ContractError> {
        self.log_record(record);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
