//! UDP 数据源
//!
//! 绑定端口后在独立线程中接收，每次接收最多等待 `recv_timeout`，
//! 以便及时观察到停止标志。

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use contracts::{DatagramCallback, DatagramSource, RawDatagram, ReceiverConfig};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::{IngestionError, Result};

/// UDP 数据源
pub struct UdpDatagramSource {
    name: String,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    max_datagram_size: usize,
    listening: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UdpDatagramSource {
    /// 按接收端配置绑定
    pub fn bind(config: &ReceiverConfig) -> Result<Self> {
        Self::bind_with(
            "udp",
            config.bind_addr,
            Duration::from_millis(config.recv_timeout_ms),
            config.max_datagram_size,
        )
    }

    /// 绑定到指定地址
    pub fn bind_with(
        name: &str,
        addr: SocketAddr,
        recv_timeout: Duration,
        max_datagram_size: usize,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(addr).map_err(|source| IngestionError::Bind { addr, source })?;
        // 零超时会被系统拒绝
        socket.set_read_timeout(Some(recv_timeout.max(Duration::from_millis(1))))?;
        let local_addr = socket.local_addr()?;

        info!(source = name, addr = %local_addr, "udp source bound");

        Ok(Self {
            name: name.to_string(),
            socket: Arc::new(socket),
            local_addr,
            max_datagram_size: max_datagram_size.max(1),
            listening: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// 实际绑定的地址 (端口 0 时由系统分配)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl DatagramSource for UdpDatagramSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn listen(&self, callback: DatagramCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let name = self.name.clone();
        let socket = self.socket.clone();
        let listening = self.listening.clone();
        let mut buf = vec![0u8; self.max_datagram_size];

        let handle = thread::spawn(move || {
            debug!(source = %name, "udp receive thread started");

            while listening.load(Ordering::Relaxed) {
                match socket.recv_from(&mut buf) {
                    Ok((len, sender)) => {
                        trace!(source = %name, len, %sender, "datagram received");
                        callback(RawDatagram::new(
                            Bytes::copy_from_slice(&buf[..len]),
                            Some(sender),
                        ));
                    }
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                    Err(e) => {
                        warn!(source = %name, error = %e, "udp receive failed");
                        thread::sleep(Duration::from_millis(10));
                    }
                }
            }

            debug!(source = %name, "udp receive thread stopped");
        });

        *self.worker.lock() = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        if let Some(handle) = self.worker.lock().take() {
            // 回调内调用 stop 时不能 join 自己
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for UdpDatagramSource {
    fn drop(&mut self) {
        self.stop();
    }
}
