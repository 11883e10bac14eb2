//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping             GET   存活检查
//! - /api/generate         POST  提交图像生成并等待结果
//! - /api/progress?id=     GET   SSE 进度推送
//! - /api/transformations  GET   列出可用的风格转换

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/generate", post(handlers::generate))
        .route("/progress", get(handlers::stream_progress))
        .route("/transformations", get(handlers::list_transformations))
}
