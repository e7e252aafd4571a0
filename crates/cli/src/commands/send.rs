//! `send` command implementation.
//!
//! Emits synthetic nested-schema datagrams, handy for exercising a receiver
//! without the sensor rig.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use ingestion::{encode, synthetic_sample, MockSourceConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::run::shutdown_signal;
use crate::cli::SendArgs;

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    if !(args.rate > 0.0) {
        anyhow::bail!("--rate must be > 0, got {}", args.rate);
    }

    let bind_addr = if args.to.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .context("Failed to bind sender socket")?;

    let config = MockSourceConfig {
        rate_hz: args.rate,
        base_distance_cm: args.distance_cm,
        include_position: args.with_position,
        seed: args.seed,
        ..Default::default()
    };

    info!(to = %args.to, rate = args.rate, count = args.count, "Sending synthetic datagrams");

    let sent = tokio::select! {
        sent = send_loop(&socket, args, &config) => sent?,
        _ = shutdown_signal() => {
            warn!("Interrupted");
            0
        }
    };

    if sent > 0 {
        info!(sent, "Done");
    }
    Ok(())
}

async fn send_loop(socket: &UdpSocket, args: &SendArgs, config: &MockSourceConfig) -> Result<u64> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / args.rate));
    let mut frame = 0u64;

    while args.count == 0 || frame < args.count {
        interval.tick().await;

        let sample = synthetic_sample(config, frame, wall_clock_seconds(), &mut rng);
        let payload = encode(&sample).context("Failed to encode sample")?;
        match socket.send_to(&payload, args.to).await {
            Ok(_) => debug!(frame, bytes = payload.len(), "datagram sent"),
            Err(e) => warn!(frame, error = %e, "send failed"),
        }
        frame += 1;
    }

    Ok(frame)
}

fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_count() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let args = SendArgs {
            to: receiver.local_addr().unwrap(),
            rate: 500.0,
            count: 3,
            distance_cm: 120.0,
            with_position: true,
            seed: 1,
        };

        run_send(&args).await.unwrap();

        let mut buf = [0u8; 2048];
        for _ in 0..3 {
            let (len, _) = tokio::time::timeout(Duration::from_secs(1), receiver.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();
            let sample = ingestion::decode(&buf[..len]).unwrap();
            assert!(sample.is_complete());
            assert!(sample.absolute_position.is_some());
        }
    }

    #[tokio::test]
    async fn test_rejects_zero_rate() {
        let args = SendArgs {
            to: "127.0.0.1:9".parse().unwrap(),
            rate: 0.0,
            count: 1,
            distance_cm: 100.0,
            with_position: false,
            seed: 0,
        };
        assert!(run_send(&args).await.is_err());
    }
}
