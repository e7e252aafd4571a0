//! Ingestion 错误类型

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 无法绑定 UDP 端口
    #[error("cannot bind udp socket on {addr}: {source}")]
    Bind {
        /// 监听地址
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Socket 设置或收发失败
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// 回放文件不可用
    #[error("replay file {path}: {message}")]
    ReplayFile {
        /// 文件路径
        path: PathBuf,
        /// 错误消息
        message: String,
    },

    /// 数据源已在监听
    #[error("source {source_name} is already listening")]
    AlreadyListening {
        /// 数据源名称
        source_name: String,
    },
}

impl IngestionError {
    pub fn replay_file(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ReplayFile {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
