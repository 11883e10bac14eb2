//! Pixmorph - 图像风格转换中继服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Generation Context: 进度记录、外部状态到本地状态的映射
//! - Transformation Context: 风格转换目录
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ProgressStore, PredictionService）
//! - Commands: 提交生成
//! - Queries: 进度推送、转换列表
//! - Services: 有界轮询、延迟清理
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + SSE
//! - Memory: ProgressStore 内存实现
//! - Adapters: Replicate 风格 HTTP 客户端、Fake 客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
