//! NetworkSink - forwards each record as one UDP datagram
//!
//! Params: `addr` (required), `format` = json|bincode, `max_packet_size`.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use contracts::{ContractError, DataSink, SinkRecord};
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

/// Largest payload that fits a UDP datagram over IPv4
const DEFAULT_MAX_PACKET_SIZE: usize = 65_507;

/// Wire encoding of forwarded records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    #[default]
    Json,
    Bincode,
}

impl NetworkFormat {
    fn parse(value: Option<&str>) -> Result<Self, String> {
        match value {
            None | Some("json") => Ok(Self::Json),
            Some("bincode") => Ok(Self::Bincode),
            Some(other) => Err(format!("unknown format '{other}' (expected json|bincode)")),
        }
    }

    fn encode(self, record: &SinkRecord) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(record).map_err(|e| e.to_string()),
            Self::Bincode => bincode::serialize(record).map_err(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Encoded records above this size are refused instead of fragmented
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr = params.get("addr").ok_or("missing 'addr' parameter")?;
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid address '{addr}': {e}"))?;

        let max_packet_size = match params.get("max_packet_size") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| format!("invalid max_packet_size '{raw}'"))?,
            None => DEFAULT_MAX_PACKET_SIZE,
        };

        Ok(Self {
            addr,
            format: NetworkFormat::parse(params.get("format").map(String::as_str))?,
            max_packet_size,
        })
    }
}

pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    /// `None` once closed
    socket: Option<UdpSocket>,
    sent: u64,
}

impl NetworkSink {
    /// Bind an ephemeral local port of the target's family and connect it
    #[instrument(name = "network_sink_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let local: SocketAddr = match config.addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(config.addr).await?;

        let name = name.into();
        debug!(sink = %name, format = ?config.format, "network sink ready");
        Ok(Self {
            name,
            config,
            socket: Some(socket),
            sent: 0,
        })
    }

    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_connection(&name, e))?;
        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))
    }

    /// Datagrams handed to the socket so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl DataSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "network_sink_write", skip(self, record), fields(sink = %self.name, seq = ?record.seq()))]
    async fn write(&mut self, record: &SinkRecord) -> Result<(), ContractError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(ContractError::sink_write(&self.name, "sink closed"));
        };

        let payload = self
            .config
            .format
            .encode(record)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;
        if payload.len() > self.config.max_packet_size {
            return Err(ContractError::sink_write(
                &self.name,
                format!(
                    "record is {} bytes, max_packet_size is {}",
                    payload.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        // 无人监听时 connect 过的 socket 会报 ConnectionRefused，不算失败
        match socket.send(&payload).await {
            Ok(_) => self.sent += 1,
            Err(e) => warn!(error = %e, target = %self.config.addr, "udp forward failed"),
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if self.socket.take().is_some() {
            debug!(sink = %self.name, sent = self.sent, "network sink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::point_record;
    use std::time::Duration;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_from_params() {
        let config = NetworkSinkConfig::from_params(&params(&[
            ("addr", "127.0.0.1:9999"),
            ("format", "bincode"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, NetworkFormat::Bincode);
        assert_eq!(config.max_packet_size, DEFAULT_MAX_PACKET_SIZE);

        assert!(NetworkSinkConfig::from_params(&params(&[
            ("addr", "127.0.0.1:9999"),
            ("format", "xml")
        ]))
        .is_err());
        assert!(NetworkSinkConfig::from_params(&params(&[("addr", "localhost")])).is_err());
        assert!(NetworkSinkConfig::from_params(&params(&[
            ("addr", "127.0.0.1:9999"),
            ("max_packet_size", "big")
        ]))
        .is_err());
        assert!(NetworkSinkConfig::from_params(&HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_forwards_json_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = NetworkSinkConfig {
            addr: receiver.local_addr().unwrap(),
            format: NetworkFormat::Json,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        };

        let mut sink = NetworkSink::new("net", config).await.unwrap();
        sink.write(&point_record(4)).await.unwrap();
        assert_eq!(sink.sent(), 1);

        let mut buf = [0u8; 2048];
        let len = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let record: SinkRecord = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(record, point_record(4));
    }

    #[tokio::test]
    async fn test_oversized_record_rejected() {
        let config = NetworkSinkConfig {
            addr: "127.0.0.1:19998".parse().unwrap(),
            format: NetworkFormat::Json,
            max_packet_size: 8,
        };
        let mut sink = NetworkSink::new("tiny", config).await.unwrap();
        assert!(sink.write(&point_record(1)).await.is_err());
        assert_eq!(sink.sent(), 0);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let config = NetworkSinkConfig {
            addr: "127.0.0.1:19997".parse().unwrap(),
            format: NetworkFormat::Bincode,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        };
        let mut sink = NetworkSink::new("closing", config).await.unwrap();
        sink.close().await.unwrap();
        assert!(sink.write(&point_record(1)).await.is_err());
    }
}
