//! TOML / JSON → `StationBlueprint`
//!
//! 所有段落都有默认值，空文档即默认站点配置 (但没有 sink)。

use std::path::Path;

use contracts::{ContractError, StationBlueprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 按扩展名判断，大小写不敏感
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// 由文件路径判断格式；没有或不认识的扩展名都是错误
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|ext| ext.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot tell the format of '{}' (expected .toml or .json)",
                path.display()
            ))
        })?;
        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }
}

pub fn parse_toml(content: &str) -> Result<StationBlueprint, ContractError> {
    toml::from_str(content)
        .map_err(|e| ContractError::config_parse_with(format!("TOML parse error: {e}"), e))
}

pub fn parse_json(content: &str) -> Result<StationBlueprint, ContractError> {
    serde_json::from_str(content)
        .map_err(|e| ContractError::config_parse_with(format!("JSON parse error: {e}"), e))
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<StationBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkType;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[receiver]
bind_addr = "127.0.0.1:5005"
recv_timeout_ms = 100
trigger_addr = "127.0.0.1:5006"

[fusion]
scale_meters = 0.01
min_strength = 80
distance_median_window = 7
flip_x = false

[shading]
max_distance_meters = 8.0

[tick]
rate_hz = 30.0

[[sinks]]
name = "cloud"
sink_type = "cloud"

[[sinks]]
name = "jsonl"
sink_type = "file"
queue_capacity = 500
params = { path = "/tmp/points.jsonl" }
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.receiver.bind_addr.port(), 5005);
        assert_eq!(bp.receiver.recv_timeout_ms, 100);
        assert_eq!(bp.receiver.trigger_addr.map(|a| a.port()), Some(5006));
        assert_eq!(bp.fusion.min_strength, 80);
        assert_eq!(bp.fusion.distance_median_window, 7);
        assert!(!bp.fusion.flip_x);
        // Unspecified fields keep defaults
        assert!(bp.fusion.flip_y);
        assert_eq!(bp.shading.max_distance_meters, 8.0);
        assert_eq!(bp.shading.min_distance_meters, 0.1);
        assert_eq!(bp.tick.rate_hz, 30.0);
        assert_eq!(bp.sinks.len(), 2);
        assert_eq!(bp.sinks[1].sink_type, SinkType::File);
        assert_eq!(bp.sinks[1].queue_capacity, 500);
        assert_eq!(
            bp.sinks[1].params.get("path").map(String::as_str),
            Some("/tmp/points.jsonl")
        );
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let bp = parse_toml("").unwrap();
        assert_eq!(bp.receiver.bind_addr.port(), 5005);
        assert_eq!(bp.fusion.max_points, 5000);
        assert_eq!(bp.tick.rate_hz, 60.0);
        // Missing [[sinks]] means an empty list, not the default cloud sink
        assert!(bp.sinks.is_empty());
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "receiver": { "bind_addr": "0.0.0.0:6000" },
            "fusion": { "use_absolute_position": false, "orientation_smoothing": 1.0 },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.receiver.bind_addr.port(), 6000);
        assert!(!bp.fusion.use_absolute_position);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn test_parse_unknown_sink_type() {
        let content = r#"
[[sinks]]
name = "x"
sink_type = "kafka"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("conf/station.JSON")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("station")).is_err());
    }
}
