use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::job::{
    parse_status, BaseVideo, ChunkMetrics, ChunkProgress, JobStatus, RegisterChunk, VerifyChunk,
    VerifySession,
};
use crate::services::media::ChunkInfo;

/// Insert a new registration job with its chunk count.
pub async fn create_base_video(
    pool: &PgPool,
    video_id: Uuid,
    filename: &str,
    object_key: &str,
    total_chunks: i32,
    duration_seconds: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO base_videos (id, filename, object_key, status, total_chunks, completed_chunks, duration_seconds)
        VALUES ($1, $2, $3, 'processing', $4, 0, $5)
        "#,
    )
    .bind(video_id)
    .bind(filename)
    .bind(object_key)
    .bind(total_chunks)
    .bind(duration_seconds)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert one pending chunk row for a registration job.
pub async fn create_register_chunk(
    pool: &PgPool,
    video_id: Uuid,
    chunk: &ChunkInfo,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO register_chunks (video_id, chunk_index, start_time, duration, status)
        VALUES ($1, $2, $3, $4, 'pending')
        "#,
    )
    .bind(video_id)
    .bind(chunk.index as i32)
    .bind(chunk.start_time)
    .bind(chunk.duration)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a new verification session against a registered base video.
pub async fn create_verify_session(
    pool: &PgPool,
    session_id: Uuid,
    base_video_id: Uuid,
    query_filename: &str,
    total_chunks: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO verify_sessions (id, base_video_id, query_filename, status, total_chunks, completed_chunks)
        VALUES ($1, $2, $3, 'processing', $4, 0)
        "#,
    )
    .bind(session_id)
    .bind(base_video_id)
    .bind(query_filename)
    .bind(total_chunks)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert one pending chunk row for a verification session.
pub async fn create_verify_chunk(
    pool: &PgPool,
    session_id: Uuid,
    chunk: &ChunkInfo,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO verify_chunks (session_id, chunk_index, start_time, duration, status)
        VALUES ($1, $2, $3, $4, 'pending')
        "#,
    )
    .bind(session_id)
    .bind(chunk.index as i32)
    .bind(chunk.start_time)
    .bind(chunk.duration)
    .execute(pool)
    .await?;

    Ok(())
}

fn base_video_from_row(row: &PgRow) -> Result<BaseVideo, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(BaseVideo {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        object_key: row.try_get("object_key")?,
        status: parse_status(&status),
        total_chunks: row.try_get("total_chunks")?,
        completed_chunks: row.try_get("completed_chunks")?,
        duration_seconds: row.try_get("duration_seconds")?,
        created_at: row.try_get("created_at")?,
    })
}

fn verify_session_from_row(row: &PgRow) -> Result<VerifySession, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(VerifySession {
        id: row.try_get("id")?,
        base_video_id: row.try_get("base_video_id")?,
        query_filename: row.try_get("query_filename")?,
        status: parse_status(&status),
        total_chunks: row.try_get("total_chunks")?,
        completed_chunks: row.try_get("completed_chunks")?,
        avg_image_similarity: row.try_get("avg_image_similarity")?,
        avg_audio_similarity: row.try_get("avg_audio_similarity")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Get a registration job by id.
pub async fn get_base_video(pool: &PgPool, video_id: Uuid) -> Result<Option<BaseVideo>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, filename, object_key, status, total_chunks, completed_chunks, duration_seconds, created_at
        FROM base_videos
        WHERE id = $1
        "#,
    )
    .bind(video_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(base_video_from_row).transpose()
}

/// List registration jobs, newest first.
pub async fn list_base_videos(pool: &PgPool) -> Result<Vec<BaseVideo>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, filename, object_key, status, total_chunks, completed_chunks, duration_seconds, created_at
        FROM base_videos
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(base_video_from_row).collect()
}

/// Chunk list for a registration job, densely ordered by index.
pub async fn get_register_chunks(
    pool: &PgPool,
    video_id: Uuid,
) -> Result<Vec<RegisterChunk>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT chunk_index, start_time, duration, status, completed_at
        FROM register_chunks
        WHERE video_id = $1
        ORDER BY chunk_index
        "#,
    )
    .bind(video_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let status: String = row.try_get("status")?;
            Ok(RegisterChunk {
                chunk_index: row.try_get("chunk_index")?,
                start_time: row.try_get("start_time")?,
                duration: row.try_get("duration")?,
                status: parse_status(&status),
                completed_at: row.try_get("completed_at")?,
            })
        })
        .collect()
}

/// Get a verification session by id.
pub async fn get_verify_session(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<Option<VerifySession>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, base_video_id, query_filename, status, total_chunks, completed_chunks,
               avg_image_similarity, avg_audio_similarity, created_at
        FROM verify_sessions
        WHERE id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(verify_session_from_row).transpose()
}

/// Sessions verifying against one base video, newest first.
pub async fn get_verify_sessions(
    pool: &PgPool,
    base_video_id: Uuid,
) -> Result<Vec<VerifySession>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, base_video_id, query_filename, status, total_chunks, completed_chunks,
               avg_image_similarity, avg_audio_similarity, created_at
        FROM verify_sessions
        WHERE base_video_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(base_video_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(verify_session_from_row).collect()
}

/// Chunk list for a verification session, densely ordered by index.
pub async fn get_verify_chunks(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<Vec<VerifyChunk>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT chunk_index, start_time, duration, image_similarity, audio_similarity, status, completed_at
        FROM verify_chunks
        WHERE session_id = $1
        ORDER BY chunk_index
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let status: String = row.try_get("status")?;
            Ok(VerifyChunk {
                chunk_index: row.try_get("chunk_index")?,
                start_time: row.try_get("start_time")?,
                duration: row.try_get("duration")?,
                image_similarity: row.try_get("image_similarity")?,
                audio_similarity: row.try_get("audio_similarity")?,
                status: parse_status(&status),
                completed_at: row.try_get("completed_at")?,
            })
        })
        .collect()
}

/// Record the terminal outcome of one registration chunk and advance the
/// parent job.
///
/// Returns `None` when the chunk was already terminal (duplicate worker
/// report); the parent count is then left untouched. The increment and the
/// total comparison happen inside a single UPDATE, so concurrent chunk
/// completions for the same job cannot under-count.
pub async fn complete_register_chunk(
    pool: &PgPool,
    video_id: Uuid,
    chunk_index: i32,
    status: JobStatus,
) -> Result<Option<ChunkProgress>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE register_chunks
        SET status = $3, completed_at = NOW()
        WHERE video_id = $1 AND chunk_index = $2 AND status NOT IN ('completed', 'failed')
        "#,
    )
    .bind(video_id)
    .bind(chunk_index)
    .bind(status.to_string())
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let row = sqlx::query(
        r#"
        UPDATE base_videos
        SET completed_chunks = completed_chunks + 1,
            status = CASE
                WHEN completed_chunks + 1 >= total_chunks THEN
                    CASE WHEN EXISTS (
                        SELECT 1 FROM register_chunks c
                        WHERE c.video_id = base_videos.id AND c.status = 'failed'
                    ) THEN 'failed' ELSE 'completed' END
                ELSE status
            END
        WHERE id = $1
        RETURNING completed_chunks, total_chunks, status
        "#,
    )
    .bind(video_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    let status: String = row.try_get("status")?;
    Ok(Some(ChunkProgress {
        completed_chunks: row.try_get("completed_chunks")?,
        total_chunks: row.try_get("total_chunks")?,
        status: parse_status(&status),
    }))
}

/// Record the terminal outcome and similarity metrics of one verification
/// chunk, advance the parent session, and refresh its running averages.
///
/// Same duplicate and atomicity semantics as [`complete_register_chunk`].
pub async fn complete_verify_chunk(
    pool: &PgPool,
    session_id: Uuid,
    chunk_index: i32,
    status: JobStatus,
    metrics: ChunkMetrics,
) -> Result<Option<ChunkProgress>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE verify_chunks
        SET status = $3, image_similarity = $4, audio_similarity = $5, completed_at = NOW()
        WHERE session_id = $1 AND chunk_index = $2 AND status NOT IN ('completed', 'failed')
        "#,
    )
    .bind(session_id)
    .bind(chunk_index)
    .bind(status.to_string())
    .bind(metrics.image_similarity)
    .bind(metrics.audio_similarity)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let row = sqlx::query(
        r#"
        UPDATE verify_sessions
        SET completed_chunks = completed_chunks + 1,
            status = CASE
                WHEN completed_chunks + 1 >= total_chunks THEN
                    CASE WHEN EXISTS (
                        SELECT 1 FROM verify_chunks c
                        WHERE c.session_id = verify_sessions.id AND c.status = 'failed'
                    ) THEN 'failed' ELSE 'completed' END
                ELSE status
            END,
            avg_image_similarity = (
                SELECT AVG(image_similarity) FROM verify_chunks c
                WHERE c.session_id = verify_sessions.id AND c.image_similarity IS NOT NULL
            ),
            avg_audio_similarity = (
                SELECT AVG(audio_similarity) FROM verify_chunks c
                WHERE c.session_id = verify_sessions.id AND c.audio_similarity IS NOT NULL
            )
        WHERE id = $1
        RETURNING completed_chunks, total_chunks, status
        "#,
    )
    .bind(session_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    let status: String = row.try_get("status")?;
    Ok(Some(ChunkProgress {
        completed_chunks: row.try_get("completed_chunks")?,
        total_chunks: row.try_get("total_chunks")?,
        status: parse_status(&status),
    }))
}
