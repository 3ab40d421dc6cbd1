use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub mod queries;

/// Connection pool for the job ledger.
///
/// Ledger traffic is bursty and short-lived: a flurry of inserts when a job
/// fans out, then single-row completion updates. Stream sessions hold no
/// connection while open, so the pool stays small; the acquire timeout is
/// kept short so an exhausted pool surfaces as a fast 500 instead of a
/// stalled upload.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(16)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .connect(database_url)
        .await
}

/// Apply pending migrations from `./migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}
