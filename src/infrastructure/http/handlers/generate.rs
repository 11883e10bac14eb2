//! Generate Handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::application::{ApplicationError, GenerateCommand};
use crate::infrastructure::http::dto::{GenerateRequest, GenerateResponseDto};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 提交图像生成，等待完成后返回图片 URL
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponseDto>, ApiError> {
    let Json(req) = payload?;

    let cmd = GenerateCommand {
        image: req.image,
        transformation: req.transformation,
    };

    // 在独立任务中执行：请求方断开后轮询仍会写入终态并调度清理
    let task_state = state.clone();
    let result = tokio::spawn(async move { task_state.generate_handler.handle(cmd).await })
        .await
        .map_err(|e| ApplicationError::internal(format!("Generation task failed: {}", e)))?;

    match result {
        Ok(response) => Ok(Json(response.into())),
        Err(e) => {
            if let Some(id) = e.generation_id() {
                tracing::warn!(generation_id = %id, error = %e, "Generation request failed");
            }
            Err(e.into())
        }
    }
}
