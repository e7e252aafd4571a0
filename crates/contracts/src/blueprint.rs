//! StationBlueprint - Config Loader 输出
//!
//! 描述完整的站点配置：UDP 接收端、融合参数、着色、节拍、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::{FusionConfig, ShadingConfig};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的站点配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// UDP 接收端设置
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// 融合管线参数
    #[serde(default)]
    pub fusion: FusionConfig,

    /// 距离着色参数
    #[serde(default)]
    pub shading: ShadingConfig,

    /// 消费端节拍
    #[serde(default)]
    pub tick: TickConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for StationBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            receiver: ReceiverConfig::default(),
            fusion: FusionConfig::default(),
            shading: ShadingConfig::default(),
            tick: TickConfig::default(),
            sinks: vec![SinkConfig {
                name: "cloud".to_string(),
                sink_type: SinkType::Cloud,
                queue_capacity: default_queue_capacity(),
                params: HashMap::new(),
            }],
        }
    }
}

/// UDP 接收端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// 监听地址
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// 单次接收的最长等待 (毫秒)，用于协作式停止
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,

    /// 接收缓冲区大小
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,

    /// 校准触发端口 (任意 UDP 包触发一次校准)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_addr: Option<SocketAddr>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            recv_timeout_ms: default_recv_timeout_ms(),
            max_datagram_size: default_max_datagram_size(),
            trigger_addr: None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5005))
}

fn default_recv_timeout_ms() -> u64 {
    250
}

fn default_max_datagram_size() -> usize {
    65507
}

/// 消费端节拍配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// 每秒调用融合管线的次数
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
        }
    }
}

fn default_rate_hz() -> f64 {
    60.0
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// JSONL 文件输出
    File,
    /// 网络输出 (UDP)
    Network,
    /// 内存点云 (max_points 限长)
    Cloud,
}
