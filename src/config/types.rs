//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 外部预测服务配置
    #[serde(default)]
    pub prediction: PredictionConfig,

    /// 生成轮询配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 进度推送配置
    #[serde(default)]
    pub progress: ProgressConfig,

    /// 转换目录配置
    #[serde(default)]
    pub transformations: TransformationsConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 请求体大小上限（data URL 图片较大）
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024 // 20 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 预测服务实现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionProvider {
    /// Replicate 风格 HTTP API
    #[default]
    Replicate,
    /// 进程内脚本化实现（本地开发）
    Fake,
}

impl PredictionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionProvider::Replicate => "replicate",
            PredictionProvider::Fake => "fake",
        }
    }
}

/// 外部预测服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    #[serde(default)]
    pub provider: PredictionProvider,

    /// API 基础 URL
    #[serde(default = "default_prediction_url")]
    pub base_url: String,

    /// API Token，未设置时回退到 REPLICATE_API_TOKEN 环境变量
    #[serde(default)]
    pub api_token: Option<String>,

    /// 单次请求超时（秒）
    #[serde(default = "default_prediction_timeout")]
    pub timeout_secs: u64,
}

fn default_prediction_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_prediction_timeout() -> u64 {
    30
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            provider: PredictionProvider::default(),
            base_url: default_prediction_url(),
            api_token: None,
            timeout_secs: default_prediction_timeout(),
        }
    }
}

/// 生成轮询配置
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// 轮询间隔（毫秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// 最大轮询次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 响应后删除进度记录的延迟（秒）
    #[serde(default = "default_cleanup_delay")]
    pub cleanup_delay_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    30
}

fn default_cleanup_delay() -> u64 {
    5
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            cleanup_delay_secs: default_cleanup_delay(),
        }
    }
}

impl GenerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }
}

/// 进度推送配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    /// 读取间隔（毫秒）
    #[serde(default = "default_progress_interval_ms")]
    pub interval_ms: u64,

    /// 单个推送最大存活时间（秒），0 表示不限制
    #[serde(default = "default_max_stream_secs")]
    pub max_stream_secs: u64,
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_max_stream_secs() -> u64 {
    120
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_progress_interval_ms(),
            max_stream_secs: default_max_stream_secs(),
        }
    }
}

impl ProgressConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_stream_secs > 0).then(|| Duration::from_secs(self.max_stream_secs))
    }
}

/// 转换目录配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformationsConfig {
    /// TOML 目录文件，未设置时使用内置目录
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
