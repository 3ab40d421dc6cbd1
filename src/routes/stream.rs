use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::services::bridge::{TASK_CHANNEL_PREFIX, VIDEO_CHANNEL_PREFIX};
use crate::services::session::StreamSession;

#[derive(Debug, Deserialize)]
pub struct SessionStreamQuery {
    /// Comma-separated task ids, in chunk order.
    #[serde(rename = "taskIds")]
    pub task_ids: String,
    #[serde(rename = "totalChunks")]
    pub total_chunks: Option<usize>,
}

/// GET /api/v1/session/{id}/stream — live progress for one verification or
/// registration session, one bus channel per dispatched task.
///
/// Emits each worker status event as an SSE frame, then exactly one terminal
/// frame (`session_complete` or `timeout`) before closing.
pub async fn session_stream(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<SessionStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let task_ids: Vec<String> = query
        .task_ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if task_ids.is_empty() {
        return Err(ApiError::BadRequest("missing taskIds parameter".to_string()));
    }
    let total_chunks = query.total_chunks.unwrap_or(task_ids.len());

    let channels: Vec<String> = task_ids
        .iter()
        .map(|id| format!("{TASK_CHANNEL_PREFIX}{id}"))
        .collect();
    let subscription = state.bridge.subscribe(channels).await?;

    let session = StreamSession::for_tasks(
        session_id.to_string(),
        task_ids,
        total_chunks,
        subscription,
        state.stream_timeout,
    );

    Ok(sse_response(session))
}

/// GET /api/v1/videos/{id}/stream — live job-level progress on the single
/// per-video channel; ends on timeout or client disconnect.
pub async fn video_stream(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let channel = format!("{VIDEO_CHANNEL_PREFIX}{video_id}");
    let subscription = state.bridge.subscribe(vec![channel]).await?;

    let session = StreamSession::for_channel(
        video_id.to_string(),
        subscription,
        state.stream_timeout,
    );

    Ok(sse_response(session))
}

fn sse_response(
    session: StreamSession,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let frames = session
        .into_frames()
        .map(|json| Ok(Event::default().data(json)));
    Sse::new(frames).keep_alive(KeepAlive::default())
}
