//! Mock 数据源
//!
//! 生成扫描运动的合成 ToF + 姿态数据 (nested 格式)，用于无硬件环境的测试。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use contracts::{
    DatagramCallback, DatagramSource, OrientationReading, RangeReading, RawDatagram, Sample,
};
use nalgebra::UnitQuaternion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::codec;

/// Mock 数据源配置
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// 发送频率 (Hz)
    pub rate_hz: f64,

    /// 目标平面距离 (厘米)
    pub base_distance_cm: f32,

    /// 左右扫描幅度 (弧度)
    pub sweep_radians: f32,

    /// 扫描周期 (秒)
    pub sweep_period_s: f64,

    /// 信号强度
    pub strength: i32,

    /// 距离噪声幅度 (厘米)
    pub noise_cm: f32,

    /// 同时携带 pos_m
    pub include_position: bool,

    /// 随机种子
    pub seed: u64,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            rate_hz: 50.0,
            base_distance_cm: 150.0,
            sweep_radians: 0.6,
            sweep_period_s: 4.0,
            strength: 800,
            noise_cm: 0.5,
            include_position: false,
            seed: 7,
        }
    }
}

/// Mock 数据源
pub struct MockDatagramSource {
    config: MockSourceConfig,
    listening: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
}

impl MockDatagramSource {
    /// 创建新的 Mock 数据源
    pub fn new(config: MockSourceConfig) -> Self {
        Self {
            config,
            listening: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 默认参数，指定频率
    pub fn with_rate(rate_hz: f64) -> Self {
        Self::new(MockSourceConfig {
            rate_hz,
            ..Default::default()
        })
    }

    /// 已发送的数据报数量
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

/// 第 `frame` 帧的合成样本
///
/// 传感器绕 Y 轴正弦扫描，正对一个 `base_distance_cm` 远的平面。
pub fn synthetic_sample(
    config: &MockSourceConfig,
    frame: u64,
    timestamp: f64,
    rng: &mut impl Rng,
) -> Sample {
    let elapsed = frame as f64 / config.rate_hz.max(1e-3);
    let phase = std::f64::consts::TAU * elapsed / config.sweep_period_s.max(1e-3);
    let yaw = config.sweep_radians * phase.sin() as f32;

    // 平面上的斜距
    let mut distance_cm = config.base_distance_cm / yaw.cos().abs().max(0.2);
    if config.noise_cm > 0.0 {
        distance_cm += rng.random_range(-config.noise_cm..=config.noise_cm);
    }

    let orientation = UnitQuaternion::from_euler_angles(0.0, yaw, 0.0);
    let absolute_position = config
        .include_position
        .then(|| orientation.transform_vector(&nalgebra::Vector3::z()) * (distance_cm * 0.01));

    Sample {
        range: Some(RangeReading {
            timestamp,
            distance_cm,
            strength: config.strength,
            temperature_c: 38.0,
        }),
        orientation: Some(OrientationReading {
            timestamp,
            quaternion: orientation.into_inner(),
        }),
        absolute_position,
    }
}

fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

impl DatagramSource for MockDatagramSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn listen(&self, callback: DatagramCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let listening = self.listening.clone();
        let sent = self.sent.clone();

        tokio::spawn(async move {
            let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(1e-3));
            let mut rng = StdRng::seed_from_u64(config.seed);
            let mut frame: u64 = 0;

            debug!(rate_hz = config.rate_hz, "mock datagram source started");

            while listening.load(Ordering::Relaxed) {
                let sample = synthetic_sample(&config, frame, wall_clock_seconds(), &mut rng);
                match codec::encode(&sample) {
                    Ok(payload) => {
                        callback(RawDatagram::new(payload, None));
                        sent.fetch_add(1, Ordering::Relaxed);
                        trace!(frame, "mock datagram sent");
                    }
                    Err(e) => warn!(error = %e, "mock sample encode failed"),
                }

                frame += 1;
                tokio::time::sleep(interval).await;
            }

            debug!(frames = frame, "mock datagram source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
