//! Replay 数据源 - 从 JSONL 录制文件回放数据报
//!
//! 每行一条 JSON 消息，原样作为数据报投递。也可以写成
//! `{"recv_offset_s": 1.25, "message": {..}}` 指定接收时刻；
//! 否则按消息自身的时间戳推算回放节奏。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{Datagram, DatagramCallback, DatagramSource, RawDatagram};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{IngestionError, Result};

/// Replay 配置
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// 回放速度倍率 (1.0 = 原速)
    pub speed_multiplier: f64,

    /// 是否循环回放
    pub loop_playback: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            loop_playback: false,
        }
    }
}

/// 一条待回放的数据报
#[derive(Debug, Clone)]
struct ReplayRecord {
    /// 相对第一条记录的时刻 (秒)
    offset_s: f64,
    payload: Bytes,
}

/// Replay 数据源
pub struct ReplayDatagramSource {
    path: PathBuf,
    records: Arc<Vec<ReplayRecord>>,
    config: ReplayConfig,
    listening: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayDatagramSource {
    /// 加载录制文件
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let file = File::open(path).map_err(|e| IngestionError::replay_file(path, e))?;
        let reader = BufReader::new(file);

        let mut raw = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| IngestionError::replay_file(path, e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            raw.push(parse_line(line));
        }

        let records = normalize_offsets(raw);
        info!(path = %path.display(), records = records.len(), "loaded replay file");

        Ok(Self {
            path: path.to_path_buf(),
            records: Arc::new(records),
            config,
            listening: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// 记录条数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 录制时长 (秒，原速)
    pub fn duration_s(&self) -> f64 {
        self.records.last().map(|r| r.offset_s).unwrap_or(0.0)
    }
}

/// 解析一行：返回 (绝对时刻, 数据报内容)
fn parse_line(line: &str) -> (Option<f64>, Bytes) {
    if let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(line) {
        if let (Some(offset), Some(message)) = (
            object.get("recv_offset_s").and_then(Value::as_f64),
            object.remove("message"),
        ) {
            let payload = match message {
                // 原始字符串按原样投递
                Value::String(s) => Bytes::from(s),
                other => Bytes::from(other.to_string()),
            };
            return (Some(offset), payload);
        }
    }

    let payload = Bytes::copy_from_slice(line.as_bytes());
    (message_timestamp(&payload), payload)
}

/// 消息自身携带的时间戳 (未知或 <= 0 时为 None)
fn message_timestamp(payload: &[u8]) -> Option<f64> {
    let t = match codec::decode_datagram(payload).ok()? {
        Datagram::Sample(sample) => sample
            .distance_timestamp()
            .or_else(|| sample.orientation_timestamp())?,
        Datagram::Markers(frame) => frame.timestamp,
    };
    (t > 0.0).then_some(t)
}

/// 转为相对时刻；缺失时沿用上一条，时间倒退时不等待
fn normalize_offsets(raw: Vec<(Option<f64>, Bytes)>) -> Vec<ReplayRecord> {
    let origin = raw.iter().find_map(|(t, _)| *t);
    let mut last_offset = 0.0_f64;

    raw.into_iter()
        .map(|(t, payload)| {
            if let (Some(t), Some(origin)) = (t, origin) {
                last_offset = (t - origin).max(last_offset);
            }
            ReplayRecord {
                offset_s: last_offset,
                payload,
            }
        })
        .collect()
}

impl DatagramSource for ReplayDatagramSource {
    fn name(&self) -> &str {
        "replay"
    }

    fn listen(&self, callback: DatagramCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let records = self.records.clone();
        let path = self.path.clone();
        let speed = self.config.speed_multiplier.max(0.1);
        let loop_playback = self.config.loop_playback;

        let handle = thread::spawn(move || {
            debug!(path = %path.display(), "replay thread started");

            loop {
                if records.is_empty() {
                    warn!(path = %path.display(), "no records to replay");
                    break;
                }

                let start_time = Instant::now();
                for record in records.iter() {
                    // 分段睡眠，及时响应 stop
                    let target = Duration::from_secs_f64(record.offset_s / speed);
                    loop {
                        if !listening.load(Ordering::Relaxed) {
                            debug!(path = %path.display(), "replay stopped");
                            return;
                        }
                        let elapsed = start_time.elapsed();
                        if elapsed >= target {
                            break;
                        }
                        thread::sleep((target - elapsed).min(Duration::from_millis(50)));
                    }

                    callback(RawDatagram::new(record.payload.clone(), None));
                }

                if !loop_playback {
                    info!(path = %path.display(), "replay completed");
                    break;
                }

                debug!(path = %path.display(), "looping replay");
                thread::sleep(Duration::from_millis(10));
            }

            listening.store(false, Ordering::SeqCst);
        });

        *self.worker.lock() = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        if let Some(handle) = self.worker.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for ReplayDatagramSource {
    fn drop(&mut self) {
        self.stop();
    }
}
