use redis::AsyncCommands;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::services::celery::{self, CodecError};

/// Worker behavior invoked for each chunk of a registration job.
pub const REGISTER_CHUNK_TASK: &str = "tasks.register.register_chunk";
/// Worker behavior invoked for each chunk of a verification session.
pub const VERIFY_CHUNK_TASK: &str = "tasks.verify.verify_video";

/// Submits one task envelope per chunk to the shared broker queue.
///
/// Submission is fire-and-forget: the dispatcher never waits for worker
/// acceptance, and gives no cross-task ordering guarantee beyond pushing
/// chunks of one job in ascending index order.
pub struct TaskDispatcher {
    client: redis::Client,
}

impl TaskDispatcher {
    pub fn new(redis_url: &str) -> Result<Self, DispatchError> {
        let client = redis::Client::open(redis_url).map_err(DispatchError::Unavailable)?;
        Ok(Self { client })
    }

    /// Push one encoded task envelope onto the broker queue.
    pub async fn submit_task(
        &self,
        task_name: &str,
        args: Vec<Value>,
    ) -> Result<Uuid, DispatchError> {
        let (payload, task_id) = celery::encode_task(task_name, args, Map::new())?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(DispatchError::Unavailable)?;
        conn.lpush::<_, _, ()>(celery::CELERY_QUEUE, &payload)
            .await
            .map_err(DispatchError::Unavailable)?;

        metrics::counter!("chunk_tasks_dispatched").increment(1);
        tracing::debug!(task = task_name, task_id = %task_id, "Task envelope pushed to broker");

        Ok(task_id)
    }

    /// Dispatch one registration chunk.
    pub async fn submit_register_chunk(
        &self,
        chunk_object_key: &str,
        video_id: Uuid,
        chunk_index: u32,
        start_time: f64,
        total_chunks: u32,
    ) -> Result<Uuid, DispatchError> {
        self.submit_task(
            REGISTER_CHUNK_TASK,
            register_chunk_args(chunk_object_key, video_id, chunk_index, start_time, total_chunks),
        )
        .await
    }

    /// Dispatch one verification chunk against a registered base video.
    pub async fn submit_verify_chunk(
        &self,
        chunk_object_key: &str,
        session_id: Uuid,
        base_video_id: Uuid,
        chunk_index: u32,
        start_time: f64,
        total_chunks: u32,
    ) -> Result<Uuid, DispatchError> {
        self.submit_task(
            VERIFY_CHUNK_TASK,
            verify_chunk_args(
                chunk_object_key,
                session_id,
                base_video_id,
                chunk_index,
                start_time,
                total_chunks,
            ),
        )
        .await
    }

    /// Check broker connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), DispatchError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(DispatchError::Unavailable)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(DispatchError::Unavailable)?;
        Ok(())
    }

    /// Current number of envelopes waiting on the broker queue.
    pub async fn queue_depth(&self) -> Result<u64, DispatchError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(DispatchError::Unavailable)?;
        let depth: u64 = conn
            .llen(celery::CELERY_QUEUE)
            .await
            .map_err(DispatchError::Unavailable)?;
        Ok(depth)
    }
}

/// Positional argument order the register worker expects.
pub fn register_chunk_args(
    chunk_object_key: &str,
    video_id: Uuid,
    chunk_index: u32,
    start_time: f64,
    total_chunks: u32,
) -> Vec<Value> {
    vec![
        json!(chunk_object_key),
        json!(video_id.to_string()),
        json!(chunk_index),
        json!(start_time),
        json!(total_chunks),
    ]
}

/// Positional argument order the verify worker expects.
pub fn verify_chunk_args(
    chunk_object_key: &str,
    session_id: Uuid,
    base_video_id: Uuid,
    chunk_index: u32,
    start_time: f64,
    total_chunks: u32,
) -> Vec<Value> {
    vec![
        json!(chunk_object_key),
        json!(session_id.to_string()),
        json!(base_video_id.to_string()),
        json!(chunk_index),
        json!(start_time),
        json!(total_chunks),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("broker unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    #[error("envelope encoding failed: {0}")]
    Encode(#[from] CodecError),
}
