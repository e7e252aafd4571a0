//! CLI 层错误；命令入口统一转成 `anyhow::Error`

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// udp / replay 数据源无法建立
    #[error("cannot start {source_name} source")]
    Source {
        source_name: &'static str,
        #[source]
        source: ingestion::IngestionError,
    },

    #[error("cannot bind calibration trigger at {addr}")]
    TriggerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Dispatcher(#[from] dispatcher::DispatcherError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn source_setup(source_name: &'static str, source: ingestion::IngestionError) -> Self {
        Self::Source {
            source_name,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
