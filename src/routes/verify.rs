use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub session_id: Uuid,
    pub task_ids: Vec<Uuid>,
    pub total_chunks: usize,
}

/// POST /api/v1/verify — upload a query video and dispatch one verification
/// task per chunk against a previously registered base video.
pub async fn verify_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VerifyResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut base_video_id: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("query.mp4")
                    .to_string();
                let data = field.bytes().await?;
                file = Some((filename, data.to_vec()));
            }
            Some("baseVideoId") => {
                let raw = field.text().await?;
                base_video_id = Some(
                    raw.parse()
                        .map_err(|_| ApiError::BadRequest(format!("invalid base video id: {raw}")))?,
                );
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;
    let base_video_id =
        base_video_id.ok_or_else(|| ApiError::BadRequest("missing baseVideoId field".to_string()))?;

    // The base job must exist; its chunks are the comparison target.
    if queries::get_base_video(&state.db, base_video_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("base video {base_video_id}")));
    }

    let scratch = tempfile::tempdir()?;
    let source_path = scratch.path().join("query.mp4");
    tokio::fs::write(&source_path, &data).await?;

    let chunks = state.media.split(&source_path, scratch.path()).await?;
    if chunks.is_empty() {
        return Err(ApiError::BadRequest("video has no playable duration".to_string()));
    }

    let session_id = Uuid::new_v4();
    queries::create_verify_session(&state.db, session_id, base_video_id, &filename, chunks.len() as i32)
        .await?;

    let mut task_ids = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        queries::create_verify_chunk(&state.db, session_id, chunk).await?;

        let chunk_key = format!("verify/{session_id}/chunk_{}.mp4", chunk.index);
        let bytes = tokio::fs::read(&chunk.path).await?;
        state.storage.upload(&chunk_key, &bytes, "video/mp4").await?;

        let task_id = state
            .dispatcher
            .submit_verify_chunk(
                &chunk_key,
                session_id,
                base_video_id,
                chunk.index,
                chunk.start_time,
                chunks.len() as u32,
            )
            .await?;
        task_ids.push(task_id);
    }

    metrics::counter!("verify_sessions_submitted").increment(1);
    tracing::info!(
        session_id = %session_id,
        base_video_id = %base_video_id,
        total_chunks = chunks.len(),
        "Verification session dispatched"
    );

    Ok(Json(VerifyResponse {
        session_id,
        total_chunks: task_ids.len(),
        task_ids,
    }))
}
