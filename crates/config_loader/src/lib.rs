//! # Config Loader
//!
//! 读取站点配置 (TOML 为主，JSON 可选)，解析为 [`StationBlueprint`] 并校验。
//! 校验遇到第一个非法字段即返回。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("station.toml"))?;
//! println!("listening on {}", blueprint.receiver.bind_addr);
//! # Ok::<(), contracts::ContractError>(())
//! ```

mod parser;
mod validator;

pub use contracts::StationBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// 读文件、按扩展名解析、校验
    pub fn load_from_path(path: &Path) -> Result<StationBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<StationBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// 没给路径时使用内置默认配置 (带一个 cloud sink)
    pub fn load_or_default(path: Option<&Path>) -> Result<StationBlueprint, ContractError> {
        let Some(path) = path else {
            let blueprint = StationBlueprint::default();
            validator::validate(&blueprint)?;
            return Ok(blueprint);
        };
        Self::load_from_path(path)
    }

    /// 校验已构建的配置，用于 CLI 覆盖参数之后
    pub fn validate(blueprint: &StationBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &StationBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse_with("cannot serialize config as TOML", e))
    }

    pub fn to_json(blueprint: &StationBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse_with("cannot serialize config as JSON", e))
    }
}
