use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{FreshdError, FreshdResult};

/// 应用配置
///
/// 配置来源优先级：内置默认值 < TOML配置文件 < `FRESHD__`前缀环境变量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 数据库文件路径，必填
    pub path: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 轮询冷却间隔，人类可读时长表达式
    pub cooldown: String,
    /// 事件广播通道容量
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                path: "data/freshd.db".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            engine: EngineConfig {
                cooldown: "60s".to_string(),
                event_capacity: 256,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&AppConfig::default()).context("构建默认配置失败")?);

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/freshd.toml", "freshd.toml", "/etc/freshd/config.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        let config = builder
            .add_source(Environment::with_prefix("FRESHD").separator("__"))
            .build()
            .context("加载配置失败")?;

        let app_config: AppConfig = config.try_deserialize().context("解析配置失败")?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// 校验配置的合法性
    pub fn validate(&self) -> FreshdResult<()> {
        if self.storage.path.trim().is_empty() {
            return Err(FreshdError::config_error("storage.path 不能为空"));
        }
        if self.storage.max_connections == 0 {
            return Err(FreshdError::config_error("storage.max_connections 必须大于0"));
        }
        humantime::parse_duration(&self.engine.cooldown).map_err(|e| {
            FreshdError::config_error(format!(
                "engine.cooldown 不是合法的时长表达式 '{}': {e}",
                self.engine.cooldown
            ))
        })?;
        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(FreshdError::config_error(format!("不支持的日志格式: {other}")));
            }
        }
        Ok(())
    }

    /// 冷却间隔的解析结果
    pub fn cooldown(&self) -> std::time::Duration {
        // validate() 保证可解析，此处兜底为默认60秒
        humantime::parse_duration(&self.engine.cooldown)
            .unwrap_or(std::time::Duration::from_secs(60))
    }
}
