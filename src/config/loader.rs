//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, PredictionProvider};
use crate::domain::transformation::{CatalogError, TransformationCatalog};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to load transformations from {path}: {source}")]
    Catalog {
        path: String,
        #[source]
        source: CatalogError,
    },
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// api_token 的回退环境变量
const TOKEN_FALLBACK_ENV: &str = "REPLICATE_API_TOKEN";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `PIXMORPH_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `PIXMORPH_SERVER__PORT=8080`
/// - `PIXMORPH_PREDICTION__PROVIDER=fake`
/// - `PIXMORPH_GENERATION__MAX_ATTEMPTS=60`
/// - `REPLICATE_API_TOKEN=r8_...`（未设置 `PIXMORPH_PREDICTION__API_TOKEN` 时使用）
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5070)?
        .set_default("server.max_body_bytes", 20 * 1024 * 1024)?
        .set_default("prediction.provider", "replicate")?
        .set_default("prediction.base_url", "https://api.replicate.com/v1")?
        .set_default("prediction.timeout_secs", 30)?
        .set_default("generation.poll_interval_ms", 2000)?
        .set_default("generation.max_attempts", 30)?
        .set_default("generation.cleanup_delay_secs", 5)?
        .set_default("progress.interval_ms", 1000)?
        .set_default("progress.max_stream_secs", 120)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: PIXMORPH_PREDICTION__BASE_URL=http://localhost:5000/v1
    builder = builder.add_source(
        Environment::with_prefix("PIXMORPH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let mut app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    apply_token_fallback(&mut app_config, std::env::var(TOKEN_FALLBACK_ENV).ok());

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 未显式配置 api_token 时使用 REPLICATE_API_TOKEN
fn apply_token_fallback(config: &mut AppConfig, fallback: Option<String>) {
    let configured = config
        .prediction
        .api_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !configured {
        config.prediction.api_token = fallback.filter(|t| !t.trim().is_empty());
    }
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.generation.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Poll interval cannot be 0".to_string(),
        ));
    }

    if config.generation.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "Max attempts cannot be 0".to_string(),
        ));
    }

    if config.progress.interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Progress interval cannot be 0".to_string(),
        ));
    }

    if config.prediction.provider == PredictionProvider::Replicate {
        if config.prediction.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Prediction base URL cannot be empty".to_string(),
            ));
        }
        if config.prediction.api_token.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Prediction API token is required (set PIXMORPH_PREDICTION__API_TOKEN or {})",
                TOKEN_FALLBACK_ENV
            )));
        }
    }

    Ok(())
}

/// 加载转换目录
///
/// 未配置路径时使用内置目录
pub fn load_transformations(config: &AppConfig) -> Result<TransformationCatalog, ConfigError> {
    let Some(path) = config.transformations.path.as_deref() else {
        return Ok(TransformationCatalog::builtin());
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::LoadError(format!("Cannot read {}: {}", path.display(), e))
    })?;

    TransformationCatalog::from_toml_str(&content).map_err(|source| ConfigError::Catalog {
        path: path.display().to_string(),
        source,
    })
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Max Body Size: {} bytes", config.server.max_body_bytes);
    tracing::info!("Prediction Provider: {}", config.prediction.provider.as_str());
    if config.prediction.provider == PredictionProvider::Replicate {
        tracing::info!("Prediction URL: {}", config.prediction.base_url);
        tracing::info!("Prediction Timeout: {}s", config.prediction.timeout_secs);
        tracing::info!(
            "Prediction Token: {}",
            redact(config.prediction.api_token.as_deref())
        );
    }
    tracing::info!(
        "Polling: every {}ms, at most {} attempts",
        config.generation.poll_interval_ms,
        config.generation.max_attempts
    );
    tracing::info!("Cleanup Delay: {}s", config.generation.cleanup_delay_secs);
    tracing::info!(
        "Progress Stream: every {}ms, max {}s",
        config.progress.interval_ms,
        config.progress.max_stream_secs
    );
    match &config.transformations.path {
        Some(path) => tracing::info!("Transformations: {}", path.display()),
        None => tracing::info!("Transformations: built-in"),
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

fn redact(token: Option<&str>) -> String {
    match token {
        Some(t) if t.chars().count() > 4 => format!("{}****", t.chars().take(4).collect::<String>()),
        Some(_) => "****".to_string(),
        None => "<unset>".to_string(),
    }
}
