//! Integration tests against live infrastructure.
//!
//! These require running PostgreSQL, Redis, and an S3-compatible object
//! store, configured via environment variables (see `AppConfig`).
//!
//! Run with: cargo test --test integration_test -- --ignored

use std::path::PathBuf;

use redis::AsyncCommands;
use uuid::Uuid;

use reprint_video::{
    config::AppConfig,
    db::{self, queries},
    models::job::{ChunkMetrics, JobStatus},
    services::{
        bridge::EventBusBridge,
        celery,
        dispatcher::TaskDispatcher,
        media::ChunkInfo,
        storage::ObjectStore,
    },
};

fn chunk(index: u32, start_time: f64, duration: f64) -> ChunkInfo {
    ChunkInfo {
        index,
        path: PathBuf::new(),
        start_time,
        duration,
    }
}

async fn test_pool() -> (AppConfig, sqlx::PgPool) {
    let config = AppConfig::from_env().expect("Failed to load config");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");
    (config, pool)
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_ledger_chunk_completion_and_failure_policy() {
    let (_config, pool) = test_pool().await;

    let video_id = Uuid::new_v4();
    queries::create_base_video(&pool, video_id, "clip.mp4", "base/clip.mp4", 3, 180.0)
        .await
        .expect("Failed to create base video");
    for i in 0..3 {
        queries::create_register_chunk(&pool, video_id, &chunk(i, i as f64 * 60.0, 60.0))
            .await
            .expect("Failed to create chunk");
    }

    let video = queries::get_base_video(&pool, video_id)
        .await
        .unwrap()
        .expect("Base video not found");
    assert_eq!(video.status, JobStatus::Processing);
    assert_eq!(video.total_chunks, 3);
    assert_eq!(video.completed_chunks, 0);

    // First two chunks complete.
    let progress = queries::complete_register_chunk(&pool, video_id, 0, JobStatus::Completed)
        .await
        .unwrap()
        .expect("First completion must advance the count");
    assert_eq!(progress.completed_chunks, 1);
    assert_eq!(progress.status, JobStatus::Processing);

    // A duplicate terminal report for the same chunk is a no-op.
    let duplicate = queries::complete_register_chunk(&pool, video_id, 0, JobStatus::Failed)
        .await
        .unwrap();
    assert!(duplicate.is_none());

    queries::complete_register_chunk(&pool, video_id, 1, JobStatus::Completed)
        .await
        .unwrap()
        .expect("Second completion must advance the count");

    // The final chunk fails: the count still reaches total, and the failure
    // policy marks the whole job failed.
    let final_progress = queries::complete_register_chunk(&pool, video_id, 2, JobStatus::Failed)
        .await
        .unwrap()
        .expect("Final completion must advance the count");
    assert_eq!(final_progress.completed_chunks, 3);
    assert_eq!(final_progress.status, JobStatus::Failed);

    let chunks = queries::get_register_chunks(&pool, video_id).await.unwrap();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].status, JobStatus::Completed);
    assert_eq!(chunks[2].status, JobStatus::Failed);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_concurrent_chunk_completions_never_overshoot() {
    let (_config, pool) = test_pool().await;

    let video_id = Uuid::new_v4();
    let total: i32 = 8;
    queries::create_base_video(&pool, video_id, "clip.mp4", "base/clip.mp4", total, 480.0)
        .await
        .unwrap();
    for i in 0..total as u32 {
        queries::create_register_chunk(&pool, video_id, &chunk(i, i as f64 * 60.0, 60.0))
            .await
            .unwrap();
    }

    // All chunks report at once; the increment-and-compare is a single
    // UPDATE, so the observed counts must be a permutation of 1..=total.
    let results = futures::future::join_all((0..total).map(|i| {
        let pool = pool.clone();
        async move { queries::complete_register_chunk(&pool, video_id, i, JobStatus::Completed).await }
    }))
    .await;

    let mut counts: Vec<i32> = results
        .into_iter()
        .map(|r| r.unwrap().expect("first report per chunk must count").completed_chunks)
        .collect();
    counts.sort_unstable();
    assert_eq!(counts, (1..=total).collect::<Vec<_>>());

    let video = queries::get_base_video(&pool, video_id)
        .await
        .unwrap()
        .expect("Base video not found");
    assert_eq!(video.completed_chunks, total);
    assert_eq!(video.status, JobStatus::Completed);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_ledger_verify_session_running_averages() {
    let (_config, pool) = test_pool().await;

    let video_id = Uuid::new_v4();
    queries::create_base_video(&pool, video_id, "base.mp4", "base/base.mp4", 1, 42.0)
        .await
        .unwrap();

    let session_id = Uuid::new_v4();
    queries::create_verify_session(&pool, session_id, video_id, "query.mp4", 2)
        .await
        .unwrap();
    queries::create_verify_chunk(&pool, session_id, &chunk(0, 0.0, 60.0)).await.unwrap();
    queries::create_verify_chunk(&pool, session_id, &chunk(1, 60.0, 30.0)).await.unwrap();

    queries::complete_verify_chunk(
        &pool,
        session_id,
        0,
        JobStatus::Completed,
        ChunkMetrics {
            image_similarity: Some(0.92),
            audio_similarity: Some(0.80),
        },
    )
    .await
    .unwrap()
    .expect("First completion must advance the count");

    let final_progress = queries::complete_verify_chunk(
        &pool,
        session_id,
        1,
        JobStatus::Completed,
        ChunkMetrics {
            image_similarity: Some(0.40),
            audio_similarity: None,
        },
    )
    .await
    .unwrap()
    .expect("Second completion must advance the count");
    assert_eq!(final_progress.completed_chunks, 2);
    assert_eq!(final_progress.status, JobStatus::Completed);

    let session = queries::get_verify_session(&pool, session_id)
        .await
        .unwrap()
        .expect("Session not found");
    assert_eq!(session.status, JobStatus::Completed);
    let avg_image = session.avg_image_similarity.expect("Missing image average");
    assert!((avg_image - 0.66).abs() < 1e-9);
    let avg_audio = session.avg_audio_similarity.expect("Missing audio average");
    assert!((avg_audio - 0.80).abs() < 1e-9);
}

#[tokio::test]
#[ignore] // Requires Redis (and no attached worker draining the queue)
async fn test_dispatcher_pushes_decodable_envelopes() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let dispatcher = TaskDispatcher::new(&config.redis_url).expect("Failed to init dispatcher");

    let video_id = Uuid::new_v4();
    let total = 3u32;
    let mut task_ids = Vec::new();
    for i in 0..total {
        let key = format!("base/{video_id}/chunk_{i}.mp4");
        let task_id = dispatcher
            .submit_register_chunk(&key, video_id, i, i as f64 * 60.0, total)
            .await
            .expect("Failed to submit chunk task");
        task_ids.push(task_id);
    }

    // N chunks produce N distinct task ids.
    let mut unique = task_ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), total as usize);

    assert!(dispatcher.queue_depth().await.unwrap() >= total as u64);

    // Pop the envelopes back off the broker queue and check the wire shape.
    let client = redis::Client::open(config.redis_url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let mut seen = 0;
    while let Some(raw) = conn
        .rpop::<_, Option<String>>(celery::CELERY_QUEUE, None)
        .await
        .unwrap()
    {
        let envelope: celery::TaskEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope.properties.delivery_info.routing_key, celery::CELERY_QUEUE);
        seen += 1;
    }
    assert!(seen >= total);
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_bridge_relays_published_events() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let bridge = EventBusBridge::new(&config.redis_url).expect("Failed to init bridge");

    let task_id = Uuid::new_v4();
    let channel = format!("task:status:{task_id}");
    let mut subscription = bridge
        .subscribe(vec![channel.clone()])
        .await
        .expect("Failed to subscribe");

    let client = redis::Client::open(config.redis_url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let payload = r#"{"status":"completed","chunk_index":0}"#;
    conn.publish::<_, _, ()>(&channel, payload).await.unwrap();

    let msg = tokio::time::timeout(std::time::Duration::from_secs(5), subscription.recv())
        .await
        .expect("Timed out waiting for relayed event")
        .expect("Subscription closed unexpectedly");
    assert_eq!(msg.channel, channel);
    assert_eq!(msg.payload, payload);

    subscription.close();
    subscription.close(); // idempotent
}

#[tokio::test]
#[ignore] // Requires an S3-compatible object store
async fn test_storage_round_trip() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let storage = ObjectStore::new(
        &config.s3_bucket,
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_access_key,
        &config.s3_secret_key,
    )
    .expect("Failed to init object store");

    let key = format!("test/{}.bin", Uuid::new_v4());
    let data = b"0123456789";
    storage.upload(&key, data, "application/octet-stream").await.unwrap();

    assert_eq!(storage.stat(&key).await.unwrap(), data.len() as u64);
    assert_eq!(storage.download(&key).await.unwrap(), data);
    assert_eq!(storage.download_range(&key, 2, Some(5)).await.unwrap(), b"2345");

    storage.delete(&key).await.unwrap();
    assert!(storage.stat(&key).await.is_err());
}
