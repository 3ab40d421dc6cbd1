pub mod chunk;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod register;
pub mod stream;
pub mod verify;

use axum::extract::Multipart;

use crate::error::ApiError;

/// Pull the uploaded video out of a multipart form (`file` field).
pub(crate) async fn extract_video_file(
    mut multipart: Multipart,
) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.mp4").to_string();
            let data = field.bytes().await?;
            return Ok((filename, data.to_vec()));
        }
    }
    Err(ApiError::BadRequest("missing file field".to_string()))
}
