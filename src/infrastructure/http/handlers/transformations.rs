//! Transformation Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::ListTransformations;
use crate::infrastructure::http::dto::TransformationDto;
use crate::infrastructure::http::state::AppState;

pub async fn list_transformations(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<TransformationDto>> {
    let items = state
        .list_transformations_handler
        .handle(ListTransformations)
        .into_iter()
        .map(TransformationDto::from)
        .collect();

    Json(items)
}
