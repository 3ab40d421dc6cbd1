use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterQuery {
    /// Optional caller-supplied job id (re-registration).
    #[serde(rename = "videoId")]
    pub video_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub video_id: Uuid,
    pub task_ids: Vec<Uuid>,
    pub total_chunks: usize,
}

/// POST /api/v1/register — upload a source video, split it into chunks, and
/// dispatch one registration task per chunk.
pub async fn register_video(
    State(state): State<AppState>,
    Query(query): Query<RegisterQuery>,
    multipart: Multipart,
) -> Result<Json<RegisterResponse>, ApiError> {
    let video_id = query.video_id.unwrap_or_else(Uuid::new_v4);
    let (filename, data) = super::extract_video_file(multipart).await?;

    // Scratch space for the source file and its segments; removed on drop.
    let scratch = tempfile::tempdir()?;
    let source_path = scratch.path().join("source.mp4");
    tokio::fs::write(&source_path, &data).await?;

    let chunks = state.media.split(&source_path, scratch.path()).await?;
    if chunks.is_empty() {
        return Err(ApiError::BadRequest("video has no playable duration".to_string()));
    }
    let duration = chunks
        .last()
        .map(|c| c.start_time + c.duration)
        .unwrap_or(0.0);

    let object_key = format!("base/{video_id}/{filename}");
    state.storage.upload(&object_key, &data, "video/mp4").await?;

    queries::create_base_video(
        &state.db,
        video_id,
        &filename,
        &object_key,
        chunks.len() as i32,
        duration,
    )
    .await?;

    // One ledger row, one chunk object, one task envelope per chunk, in
    // ascending index order.
    let mut task_ids = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        queries::create_register_chunk(&state.db, video_id, chunk).await?;

        let chunk_key = format!("base/{video_id}/chunk_{}.mp4", chunk.index);
        let bytes = tokio::fs::read(&chunk.path).await?;
        state.storage.upload(&chunk_key, &bytes, "video/mp4").await?;

        let task_id = state
            .dispatcher
            .submit_register_chunk(
                &chunk_key,
                video_id,
                chunk.index,
                chunk.start_time,
                chunks.len() as u32,
            )
            .await?;
        task_ids.push(task_id);
    }

    metrics::counter!("register_jobs_submitted").increment(1);
    tracing::info!(
        video_id = %video_id,
        total_chunks = chunks.len(),
        duration_seconds = duration,
        "Registration job dispatched"
    );

    Ok(Json(RegisterResponse {
        video_id,
        total_chunks: task_ids.len(),
        task_ids,
    }))
}
