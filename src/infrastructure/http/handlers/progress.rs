//! Progress Stream Handler (SSE)

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;

use crate::application::StreamProgress;
use crate::domain::generation::GenerationId;
use crate::infrastructure::http::dto::ProgressParams;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 推送 generation 的进度记录，每个事件的 data 为 `{status, progress, message}`
pub async fn stream_progress(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProgressParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let generation_id = params
        .id
        .and_then(GenerationId::parse)
        .ok_or_else(|| ApiError::BadRequest("Missing required query parameter: id".to_string()))?;

    let rx = state.stream_progress_handler.handle(StreamProgress { generation_id });

    let events = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|record| (record, rx))
    })
    .filter_map(|record| async move {
        match Event::default().json_data(&record) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize progress event");
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
