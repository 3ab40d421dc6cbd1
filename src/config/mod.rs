use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (broker queue and status bus)
    pub redis_url: String,

    /// Object store bucket name
    pub s3_bucket: String,

    /// Object store endpoint URL (S3-compatible)
    pub s3_endpoint: String,

    /// Object store region
    #[serde(default = "default_s3_region")]
    pub s3_region: String,

    /// Object store access key ID
    pub s3_access_key: String,

    /// Object store secret access key
    pub s3_secret_key: String,

    /// Fixed duration of one video chunk, in seconds
    #[serde(default = "default_chunk_duration")]
    pub chunk_duration_seconds: u64,

    /// How long an open progress stream waits for a terminal condition
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_seconds: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_chunk_duration() -> u64 {
    60
}

fn default_stream_timeout() -> u64 {
    600
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
