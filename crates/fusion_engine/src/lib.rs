//! # Fusion Engine
//!
//! ToF 距离 + 姿态四元数融合管线。
//!
//! 负责：
//! - 时间戳对齐门限
//! - 手动触发的姿态校准
//! - 姿态指数平滑 (slerp)
//! - 距离中值滤波与跳变剔除
//! - 输出 `FusedPoint` 或拒绝原因
//!
//! ## 使用示例
//!
//! ```ignore
//! use fusion_engine::{FusionConfig, FusionPipeline, ShadingConfig};
//!
//! let mut pipeline = FusionPipeline::new(FusionConfig::default(), ShadingConfig::default());
//!
//! // Each tick
//! let outcome = pipeline.tick(&slot, calibrate_pending, sink_ready);
//! if let Some(Ok(point)) = outcome.fused.map(|f| f.outcome) {
//!     // Handle point
//! }
//! ```

mod alignment;
mod calibrator;
mod deriver;
mod engine;
mod median;
mod shading;
mod smoother;

pub use alignment::{is_aligned, timestamp_delta};
pub use calibrator::OrientationCalibrator;
pub use deriver::{derive, derive_absolute, direction, forward};
pub use engine::{FusionPipeline, FusionResult, FusionStats, TickOutcome};
pub use median::DistanceFilter;
pub use shading::shade;
pub use smoother::{slerp, OrientationSmoother};

// Re-export contracts types
pub use contracts::{FusedPoint, FusionConfig, PointSource, RejectionReason, Sample, ShadingConfig};
