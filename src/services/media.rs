use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// One segment produced by splitting a source video.
#[derive(Debug, Clone)]
pub struct ChunkInfo {
    pub index: u32,
    pub path: PathBuf,
    pub start_time: f64,
    pub duration: f64,
}

/// Segmentation collaborator: shells out to ffprobe/ffmpeg to split a source
/// video into fixed-duration, stream-copied segments.
pub struct MediaSplitter {
    chunk_duration: f64,
}

impl MediaSplitter {
    pub fn new(chunk_duration_seconds: u64) -> Self {
        Self {
            chunk_duration: chunk_duration_seconds as f64,
        }
    }

    /// Probe the container duration in seconds.
    pub async fn probe_duration(&self, video: &Path) -> Result<f64, MediaError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(video)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(MediaError::Spawn)?;

        if !output.status.success() {
            return Err(MediaError::Tool {
                tool: "ffprobe",
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        raw.trim()
            .parse::<f64>()
            .map_err(|_| MediaError::Probe(raw.trim().to_string()))
    }

    /// Split `video` into segments under `out_dir`, ascending index order.
    ///
    /// Segments are stream-copied (`-c copy`), so boundaries snap to
    /// keyframes; start/duration metadata reflects the requested grid, which
    /// is what the ledger records.
    pub async fn split(&self, video: &Path, out_dir: &Path) -> Result<Vec<ChunkInfo>, MediaError> {
        let total = self.probe_duration(video).await?;
        let plan = chunk_plan(total, self.chunk_duration);

        let mut chunks = Vec::with_capacity(plan.len());
        for (index, (start_time, duration)) in plan.into_iter().enumerate() {
            let index = index as u32;
            let path = out_dir.join(format!("chunk_{index}.mp4"));

            let output = Command::new("ffmpeg")
                .arg("-i")
                .arg(video)
                .args(["-ss", &start_time.to_string(), "-t", &duration.to_string()])
                .args(["-c", "copy", "-y"])
                .arg(&path)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(MediaError::Spawn)?;

            if !output.status.success() {
                return Err(MediaError::Tool {
                    tool: "ffmpeg",
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }

            chunks.push(ChunkInfo {
                index,
                path,
                start_time,
                duration,
            });
        }

        tracing::debug!(
            chunks = chunks.len(),
            total_duration = total,
            "Video split into segments"
        );

        Ok(chunks)
    }
}

/// Compute the (start_time, duration) grid for a video of `total` seconds.
/// Start offsets increase monotonically; the last segment absorbs the
/// remainder.
fn chunk_plan(total: f64, chunk_duration: f64) -> Vec<(f64, f64)> {
    if total <= 0.0 {
        return Vec::new();
    }
    let count = (total / chunk_duration).ceil() as usize;
    (0..count)
        .map(|i| {
            let start = i as f64 * chunk_duration;
            (start, (total - start).min(chunk_duration))
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to spawn media tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{tool} failed: {stderr}")]
    Tool { tool: &'static str, stderr: String },

    #[error("unparseable ffprobe duration: {0}")]
    Probe(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_exact_multiple() {
        let plan = chunk_plan(120.0, 60.0);
        assert_eq!(plan, vec![(0.0, 60.0), (60.0, 60.0)]);
    }

    #[test]
    fn test_plan_with_remainder() {
        let plan = chunk_plan(130.0, 60.0);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2], (120.0, 10.0));
    }

    #[test]
    fn test_plan_shorter_than_one_chunk() {
        let plan = chunk_plan(12.5, 60.0);
        assert_eq!(plan, vec![(0.0, 12.5)]);
    }

    #[test]
    fn test_plan_empty_video() {
        assert!(chunk_plan(0.0, 60.0).is_empty());
    }
}
