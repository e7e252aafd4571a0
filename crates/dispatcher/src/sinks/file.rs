//! FileSink - appends records to a JSONL file, one record per line

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, DataSink, SinkRecord};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
}

impl FileSinkConfig {
    /// `path` wins; otherwise a timestamped file under `base_path` (default `./output`)
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        if let Some(path) = params.get("path") {
            return Self {
                path: PathBuf::from(path),
            };
        }

        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        Self {
            path: base_path.join(format!("points_{stamp}.jsonl")),
        }
    }
}

/// Sink that appends records as JSON lines
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    lines: u64,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: Some(BufWriter::new(file)),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, record: &SinkRecord) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file sink already closed"))?;
        serde_json::to_writer(&mut *writer, record).map_err(std::io::Error::other)?;
        writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn persist(&mut self, record: &SinkRecord) -> Result<(), ContractError> {
        self.append(record).map_err(|e| {
            error!(sink = %self.name, seq = ?record.seq(), error = %e, "write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink_write", skip(self, record), fields(sink = %self.name, seq = ?record.seq()))]
    async fn write(&mut self, record: &SinkRecord) -> Result<(), ContractError> {
        self.persist(record)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, path = %self.path.display(), lines = self.lines, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::point_record;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_appends_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("points.jsonl");

        let mut sink = FileSink::new("test_file", FileSinkConfig { path: path.clone() }).unwrap();
        sink.write(&point_record(1)).await.unwrap();
        sink.write(&point_record(2)).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: SinkRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, point_record(1));
        assert!(lines[1].contains(r#""type":"point""#));

        // Closed sink refuses writes
        assert!(sink.write(&point_record(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_file_sink_default_name() {
        let dir = tempdir().unwrap();
        let mut params = HashMap::new();
        params.insert(
            "base_path".to_string(),
            dir.path().to_string_lossy().to_string(),
        );

        let sink = FileSink::from_params("auto", &params).unwrap();
        let file_name = sink.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("points_"));
        assert!(file_name.ends_with(".jsonl"));
        assert!(sink.path().exists());
    }
}
