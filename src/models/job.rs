use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status shared by jobs, sessions, and their chunks.
///
/// Transitions only move forward: `pending -> processing -> {completed, failed}`.
/// `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A registered base video, split into `total_chunks` fixed-duration chunks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseVideo {
    pub id: Uuid,
    pub filename: String,
    pub object_key: Option<String>,
    pub status: JobStatus,
    pub total_chunks: i32,
    pub completed_chunks: i32,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// One time-bounded segment of a registration job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterChunk {
    pub chunk_index: i32,
    pub start_time: f64,
    pub duration: f64,
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A verification session comparing a query video against a base video.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySession {
    pub id: Uuid,
    pub base_video_id: Uuid,
    pub query_filename: String,
    pub status: JobStatus,
    pub total_chunks: i32,
    pub completed_chunks: i32,
    pub avg_image_similarity: Option<f64>,
    pub avg_audio_similarity: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// One time-bounded segment of a verification session, carrying similarity
/// scores once its worker completes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChunk {
    pub chunk_index: i32,
    pub start_time: f64,
    pub duration: f64,
    pub image_similarity: Option<f64>,
    pub audio_similarity: Option<f64>,
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Similarity metrics reported by a worker for one completed chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkMetrics {
    pub image_similarity: Option<f64>,
    pub audio_similarity: Option<f64>,
}

/// Parent progress returned by the atomic chunk-completion update.
#[derive(Debug, Clone, Copy)]
pub struct ChunkProgress {
    pub completed_chunks: i32,
    pub total_chunks: i32,
    pub status: JobStatus,
}

/// Parse a status column value, falling back to `pending` for unknown strings.
pub fn parse_status(raw: &str) -> JobStatus {
    raw.parse().unwrap_or(JobStatus::Pending)
}
