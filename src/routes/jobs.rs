use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::error::ApiError;
use crate::models::job::{BaseVideo, RegisterChunk, VerifyChunk, VerifySession};

#[derive(Debug, Serialize)]
pub struct BaseVideoDetail {
    #[serde(flatten)]
    pub video: BaseVideo,
    pub chunks: Vec<RegisterChunk>,
}

#[derive(Debug, Serialize)]
pub struct VerifySessionDetail {
    #[serde(flatten)]
    pub session: VerifySession,
    pub chunks: Vec<VerifyChunk>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsResponse {
    pub base_video: Option<BaseVideoDetail>,
    pub verify_sessions: Vec<VerifySessionDetail>,
}

/// GET /api/v1/jobs/{video_id} — point-in-time aggregate state for a
/// registration job and every verification session run against it.
pub async fn get_jobs(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<JobsResponse>, ApiError> {
    let base_video = match queries::get_base_video(&state.db, video_id).await? {
        Some(video) => Some(BaseVideoDetail {
            chunks: queries::get_register_chunks(&state.db, video_id).await?,
            video,
        }),
        None => None,
    };

    let mut verify_sessions = Vec::new();
    for session in queries::get_verify_sessions(&state.db, video_id).await? {
        let chunks = queries::get_verify_chunks(&state.db, session.id).await?;
        verify_sessions.push(VerifySessionDetail { session, chunks });
    }

    Ok(Json(JobsResponse {
        base_video,
        verify_sessions,
    }))
}

/// GET /api/v1/videos — registered base videos, newest first.
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<BaseVideo>>, ApiError> {
    Ok(Json(queries::list_base_videos(&state.db).await?))
}

/// GET /api/v1/sessions/{id} — one verification session with its chunk list.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<VerifySessionDetail>, ApiError> {
    let session = queries::get_verify_session(&state.db, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {session_id}")))?;
    let chunks = queries::get_verify_chunks(&state.db, session_id).await?;

    Ok(Json(VerifySessionDetail { session, chunks }))
}
