//! 配置校验模块
//!
//! 校验规则：
//! - scale_meters > 0
//! - orientation_smoothing ∈ [0, 1]
//! - 时间戳差与跳变阈值非负
//! - max_points > 0
//! - 着色区间有序
//! - tick.rate_hz > 0, recv_timeout_ms > 0
//! - sink 名称非空且唯一

use std::collections::HashSet;

use contracts::{ContractError, StationBlueprint};

/// 校验 StationBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &StationBlueprint) -> Result<(), ContractError> {
    validate_fusion(blueprint)?;
    validate_shading(blueprint)?;
    validate_timing(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验融合参数
fn validate_fusion(blueprint: &StationBlueprint) -> Result<(), ContractError> {
    let fusion = &blueprint.fusion;

    // NaN 同样拒绝
    if !(fusion.scale_meters > 0.0) {
        return Err(ContractError::config_validation(
            "fusion.scale_meters",
            format!("scale_meters must be > 0, got {}", fusion.scale_meters),
        ));
    }

    if !(0.0..=1.0).contains(&fusion.orientation_smoothing) {
        return Err(ContractError::config_validation(
            "fusion.orientation_smoothing",
            format!(
                "orientation_smoothing must be within [0, 1], got {}",
                fusion.orientation_smoothing
            ),
        ));
    }

    if !(fusion.max_timestamp_delta_seconds >= 0.0) {
        return Err(ContractError::config_validation(
            "fusion.max_timestamp_delta_seconds",
            format!(
                "max_timestamp_delta_seconds must be >= 0, got {}",
                fusion.max_timestamp_delta_seconds
            ),
        ));
    }

    if !(fusion.max_distance_jump_meters >= 0.0) {
        return Err(ContractError::config_validation(
            "fusion.max_distance_jump_meters",
            format!(
                "max_distance_jump_meters must be >= 0, got {}",
                fusion.max_distance_jump_meters
            ),
        ));
    }

    if fusion.max_points == 0 {
        return Err(ContractError::config_validation(
            "fusion.max_points",
            "max_points must be > 0",
        ));
    }

    Ok(())
}

/// 校验着色区间
fn validate_shading(blueprint: &StationBlueprint) -> Result<(), ContractError> {
    let shading = &blueprint.shading;

    if !(shading.min_distance_meters <= shading.max_distance_meters) {
        return Err(ContractError::config_validation(
            "shading.min_distance_meters / shading.max_distance_meters",
            format!(
                "min_distance_meters ({}) must be <= max_distance_meters ({})",
                shading.min_distance_meters, shading.max_distance_meters
            ),
        ));
    }

    if !(shading.min_intensity <= shading.max_intensity) {
        return Err(ContractError::config_validation(
            "shading.min_intensity / shading.max_intensity",
            format!(
                "min_intensity ({}) must be <= max_intensity ({})",
                shading.min_intensity, shading.max_intensity
            ),
        ));
    }

    Ok(())
}

/// 校验节拍与接收超时
fn validate_timing(blueprint: &StationBlueprint) -> Result<(), ContractError> {
    if !(blueprint.tick.rate_hz > 0.0) || !blueprint.tick.rate_hz.is_finite() {
        return Err(ContractError::config_validation(
            "tick.rate_hz",
            format!("rate_hz must be > 0, got {}", blueprint.tick.rate_hz),
        ));
    }

    if blueprint.receiver.recv_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "receiver.recv_timeout_ms",
            "recv_timeout_ms must be > 0",
        ));
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &StationBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}
