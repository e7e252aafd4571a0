//! 融合管线指标收集模块
//!
//! 计数器在各自的产生处直接打点 (ingestion / fusion_engine / dispatcher)，
//! 这里补充节拍级的 gauge，以及一个用于运行结束摘要的内存聚合器。

use std::collections::HashMap;

use contracts::{FusedPoint, PointSource, RejectionReason};
use metrics::{counter, gauge, histogram};

/// 记录一次融合结果
///
/// 每个消费了新样本的节拍调用一次。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_fusion_outcome;
///
/// if let Some(result) = pipeline.tick(&slot, calibrate, ready).fused {
///     record_fusion_outcome(&result.outcome, result.slot_seq);
/// }
/// ```
pub fn record_fusion_outcome(outcome: &Result<FusedPoint, RejectionReason>, slot_seq: u64) {
    counter!("tof_fuse_samples_processed_total").increment(1);
    gauge!("tof_fuse_last_slot_seq").set(slot_seq as f64);

    match outcome {
        Ok(point) => {
            gauge!("tof_fuse_last_distance_meters").set(point.distance_meters as f64);
            gauge!("tof_fuse_last_shade_t").set(point.shade.t as f64);
        }
        Err(reason) => {
            gauge!("tof_fuse_last_rejection", "reason" => reason.as_str()).set(slot_seq as f64);
        }
    }
}

/// 记录单个节拍耗时
pub fn record_tick_duration_ms(duration_ms: f64) {
    histogram!("tof_fuse_tick_duration_ms").record(duration_ms);
}

/// 记录 sink 队列深度
pub fn record_sink_queue_depth(sink_name: &str, depth: usize) {
    gauge!(
        "tof_fuse_sink_queue_depth",
        "sink" => sink_name.to_string()
    )
    .set(depth as f64);
}

/// 记录点云当前点数
pub fn record_cloud_size(sink_name: &str, points: usize) {
    gauge!(
        "tof_fuse_cloud_points",
        "sink" => sink_name.to_string()
    )
    .set(points as f64);
}

/// 记录距离上一个数据报的时间
pub fn record_receiver_silence_ms(age_ms: f64) {
    gauge!("tof_fuse_receiver_silence_ms").set(age_ms);
}

/// 融合指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FusionMetricsAggregator {
    /// 处理过的样本数
    pub total_processed: u64,

    /// 推导分支接受的点数
    pub accepted_derived: u64,

    /// 绝对位置分支接受的点数
    pub accepted_absolute: u64,

    /// 校准次数
    pub calibrations: u64,

    /// 各拒绝原因计数
    pub rejections: HashMap<RejectionReason, u64>,

    /// 距离统计 (米)
    pub distance_stats: RunningStats,

    /// 时间戳差统计 (毫秒)
    pub delta_stats: RunningStats,

    /// 节拍耗时统计 (毫秒)
    pub tick_stats: RunningStats,
}

impl FusionMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, outcome: &Result<FusedPoint, RejectionReason>) {
        self.total_processed += 1;
        match outcome {
            Ok(point) => {
                match point.source {
                    PointSource::Derived => self.accepted_derived += 1,
                    PointSource::Absolute => self.accepted_absolute += 1,
                }
                self.distance_stats.push(point.distance_meters as f64);
            }
            Err(reason) => {
                *self.rejections.entry(*reason).or_insert(0) += 1;
            }
        }
    }

    /// 记录一次 range/orientation 时间戳差 (秒)
    pub fn record_timestamp_delta(&mut self, delta_seconds: f64) {
        self.delta_stats.push(delta_seconds.abs() * 1000.0);
    }

    pub fn record_calibration(&mut self) {
        self.calibrations += 1;
    }

    pub fn record_tick(&mut self, duration_ms: f64) {
        self.tick_stats.push(duration_ms);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted_derived + self.accepted_absolute
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let rejected: u64 = self.rejections.values().sum();
        MetricsSummary {
            total_processed: self.total_processed,
            accepted_derived: self.accepted_derived,
            accepted_absolute: self.accepted_absolute,
            total_rejected: rejected,
            calibrations: self.calibrations,
            acceptance_rate: if self.total_processed > 0 {
                self.accepted() as f64 / self.total_processed as f64 * 100.0
            } else {
                0.0
            },
            rejection_counts: RejectionReason::ALL
                .iter()
                .filter_map(|reason| {
                    self.rejections
                        .get(reason)
                        .map(|count| (reason.as_str(), *count))
                })
                .collect(),
            distance_m: StatsSummary::from(&self.distance_stats),
            timestamp_delta_ms: StatsSummary::from(&self.delta_stats),
            tick_ms: StatsSummary::from(&self.tick_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_processed: u64,
    pub accepted_derived: u64,
    pub accepted_absolute: u64,
    pub total_rejected: u64,
    pub calibrations: u64,
    pub acceptance_rate: f64,
    /// 按 `RejectionReason::ALL` 顺序排列
    pub rejection_counts: Vec<(&'static str, u64)>,
    pub distance_m: StatsSummary,
    pub timestamp_delta_ms: StatsSummary,
    pub tick_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fusion Metrics Summary ===")?;
        writeln!(f, "Samples processed: {}", self.total_processed)?;
        writeln!(
            f,
            "Points accepted: {} ({:.2}%) [derived={}, absolute={}]",
            self.accepted_derived + self.accepted_absolute,
            self.acceptance_rate,
            self.accepted_derived,
            self.accepted_absolute
        )?;
        writeln!(f, "Samples rejected: {}", self.total_rejected)?;
        writeln!(f, "Calibrations: {}", self.calibrations)?;
        writeln!(f, "Distance (m): {}", self.distance_m)?;
        writeln!(f, "Timestamp delta (ms): {}", self.timestamp_delta_ms)?;
        writeln!(f, "Tick duration (ms): {}", self.tick_ms)?;

        if !self.rejection_counts.is_empty() {
            writeln!(f, "Rejections by reason:")?;
            for (reason, count) in &self.rejection_counts {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 一组数值的汇总；`count == 0` 时其余字段无意义
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return f.write_str("N/A");
        }
        write!(
            f,
            "{:.3} ± {:.3} [{:.3}, {:.3}] (n={})",
            self.mean, self.std_dev, self.min, self.max, self.count
        )
    }
}

/// Welford 在线均值/方差，O(1) 内存
#[derive(Debug, Clone)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    /// 与均值之差的平方和
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let before = value - self.mean;
        self.mean += before / self.count as f64;
        self.m2 += before * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 空时为 0
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 样本方差 (n - 1)
    pub fn variance(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => self.m2 / (n - 1) as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 空时为 0
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }
}
