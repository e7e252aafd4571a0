//! Calibration trigger.
//!
//! External "capture now" requests (stdin lines, trigger datagrams) are
//! coalesced into one pending flag that the next tick consumes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CliError, Result};

/// Pending calibration flag shared between listeners and the tick loop
#[derive(Debug, Clone, Default)]
pub struct CalibrationTrigger {
    pending: Arc<AtomicBool>,
}

impl CalibrationTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a capture on the next tick. Repeated requests coalesce.
    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume the pending request
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Listen on stdin: an empty line or `c` requests a capture.
    pub fn spawn_stdin_listener(&self) -> JoinHandle<()> {
        let trigger = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if is_calibrate_command(&line) {
                            info!("calibration requested from stdin");
                            trigger.request();
                        } else {
                            debug!(line = %line.trim(), "ignored stdin input");
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed, stdin calibration disabled");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed, stdin calibration disabled");
                        break;
                    }
                }
            }
        })
    }

    /// Bind `addr` and treat every datagram as a capture request.
    pub async fn spawn_udp_listener(&self, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>)> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| CliError::TriggerBind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| CliError::TriggerBind { addr, source })?;
        info!(addr = %local_addr, "calibration trigger listening");

        let trigger = self.clone();
        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((_, sender)) => {
                        info!(%sender, "calibration requested over UDP");
                        trigger.request();
                    }
                    Err(e) => {
                        warn!(error = %e, "trigger socket receive failed");
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    }
                }
            }
        });

        Ok((local_addr, handle))
    }
}

fn is_calibrate_command(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.eq_ignore_ascii_case("c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_requests_coalesce() {
        let trigger = CalibrationTrigger::new();
        assert!(!trigger.take());

        trigger.request();
        trigger.request();
        assert!(trigger.is_pending());
        assert!(trigger.take());
        assert!(!trigger.take());
    }

    #[test]
    fn test_calibrate_command() {
        assert!(is_calibrate_command(""));
        assert!(is_calibrate_command("  \r"));
        assert!(is_calibrate_command("c"));
        assert!(is_calibrate_command("C"));
        assert!(!is_calibrate_command("quit"));
    }

    #[tokio::test]
    async fn test_udp_trigger() {
        let trigger = CalibrationTrigger::new();
        let (addr, handle) = trigger
            .spawn_udp_listener("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"x", addr).await.unwrap();

        let mut waited = Duration::ZERO;
        while !trigger.is_pending() && waited < Duration::from_secs(2) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }
        assert!(trigger.take());
        handle.abort();
    }
}
