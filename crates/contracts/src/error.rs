//! 错误定义
//!
//! `ContractError` 覆盖配置与 sink；接收端绑定失败属于 `ingestion::IngestionError`。
//! 解码失败单独用 `DecodeError`，它只会导致丢弃当前数据报。

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ContractError {
    /// TOML/JSON 无法解析为 `StationBlueprint`
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// 解析成功但取值非法；`field` 为点分路径，如 `fusion.scale_meters`
    #[error("invalid config value at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("sink '{sink_name}' write failed: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// 创建 sink 时失败 (参数缺失、地址无效、无法打开文件等)
    #[error("sink '{sink_name}' unavailable: {message}")]
    SinkConnection { sink_name: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// 保留底层解析器错误作为 source
    pub fn config_parse_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// 配置字段路径 (仅校验错误)
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ConfigValidation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Datagram decode failure
///
/// The datagram is dropped; no pipeline state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not valid UTF-8 JSON, or no known schema matched
    #[error("malformed datagram: {reason}")]
    Malformed { reason: String },
}

impl DecodeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}
