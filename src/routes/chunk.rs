use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;

/// GET /api/v1/chunk/{session_id}/{index} — fetch one verification chunk's
/// media, honoring simple `bytes=a-b` range requests.
pub async fn get_chunk_media(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(Uuid, u32)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = format!("verify/{session_id}/chunk_{index}.mp4");
    let size = state.storage.stat(&key).await?;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, size));

    let response = match range {
        Some((start, end)) => {
            let body = state.storage.download_range(&key, start, Some(end)).await?;
            (
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, "video/mp4".to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, body.len().to_string()),
                    (header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}")),
                ],
                body,
            )
                .into_response()
        }
        None => {
            let body = state.storage.download(&key).await?;
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "video/mp4".to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, body.len().to_string()),
                ],
                body,
            )
                .into_response()
        }
    };

    Ok(response)
}

/// Parse a single-range `bytes=` header against an object of `size` bytes.
/// Returns inclusive (start, end), or `None` for absent/unsatisfiable ranges
/// (which fall back to a full-body response).
fn parse_range(value: &str, size: u64) -> Option<(u64, u64)> {
    if size == 0 {
        return None;
    }
    let spec = value.strip_prefix("bytes=")?;
    let (start_raw, end_raw) = spec.split_once('-')?;

    if start_raw.is_empty() {
        // Suffix form: last N bytes.
        let n: u64 = end_raw.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((size.saturating_sub(n), size - 1));
    }

    let start: u64 = start_raw.parse().ok()?;
    if start >= size {
        return None;
    }
    let end = if end_raw.is_empty() {
        size - 1
    } else {
        end_raw.parse::<u64>().ok()?.min(size - 1)
    };
    if end < start {
        return None;
    }
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_forms() {
        assert_eq!(parse_range("bytes=0-99", 100), Some((0, 99)));
        assert_eq!(parse_range("bytes=10-19", 100), Some((10, 19)));
        assert_eq!(parse_range("bytes=50-", 100), Some((50, 99)));
        assert_eq!(parse_range("bytes=-10", 100), Some((90, 99)));
    }

    #[test]
    fn test_range_clamped_to_object_size() {
        assert_eq!(parse_range("bytes=90-500", 100), Some((90, 99)));
        assert_eq!(parse_range("bytes=-500", 100), Some((0, 99)));
    }

    #[test]
    fn test_unsatisfiable_ranges_rejected() {
        assert_eq!(parse_range("bytes=100-", 100), None);
        assert_eq!(parse_range("bytes=20-10", 100), None);
        assert_eq!(parse_range("bytes=-0", 100), None);
        assert_eq!(parse_range("bytes=abc-", 100), None);
        assert_eq!(parse_range("items=0-10", 100), None);
        assert_eq!(parse_range("bytes=0-10", 0), None);
    }
}
