use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::job::JobStatus;

/// A chunk-status notification published by a worker.
///
/// Workers attach a variable set of extra fields (similarity scores, chunk
/// timings, error messages); those are preserved verbatim through `extra` so
/// the relayed frame matches what the worker published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkStatusEvent {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Closed set of message shapes a stream session can receive from the bus.
///
/// Anything that does not parse as a status event is relayed as an opaque
/// frame rather than dropped or treated as fatal.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Status(ChunkStatusEvent),
    Opaque(String),
}

impl BusEvent {
    pub fn parse(payload: &str) -> Self {
        match serde_json::from_str::<ChunkStatusEvent>(payload) {
            Ok(event) => BusEvent::Status(event),
            Err(_) => BusEvent::Opaque(payload.to_string()),
        }
    }
}

/// A frame emitted on an outgoing progress stream.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    /// A worker status event relayed verbatim, augmented with the task id
    /// derived from the originating channel.
    Status { task_id: String, event: ChunkStatusEvent },
    /// A bus message relayed as-is (unparseable, or from a channel with no
    /// task mapping).
    Opaque(String),
    /// Synthetic terminal frame: every chunk reached a terminal state. The
    /// status carries the aggregate outcome (`failed` if any chunk failed).
    SessionComplete { session_id: String, status: JobStatus },
    /// Synthetic terminal frame: the session ended without completing.
    Timeout { session_id: String },
}

impl StreamFrame {
    /// Serialize the frame to the JSON text sent as one SSE `data:` payload.
    pub fn to_json(&self) -> String {
        match self {
            StreamFrame::Status { task_id, event } => {
                let mut value = serde_json::to_value(event).unwrap_or(Value::Null);
                if let Value::Object(ref mut map) = value {
                    map.insert("taskId".to_string(), Value::String(task_id.clone()));
                }
                value.to_string()
            }
            StreamFrame::Opaque(raw) => raw.clone(),
            StreamFrame::SessionComplete { session_id, status } => serde_json::json!({
                "type": "session_complete",
                "status": status,
                "sessionId": session_id,
            })
            .to_string(),
            StreamFrame::Timeout { session_id } => serde_json::json!({
                "type": "timeout",
                "status": "timeout",
                "sessionId": session_id,
            })
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_worker_status_event() {
        let payload = r#"{"type":"verify_chunk_complete","session_id":"abc","chunk_index":2,"image_similarity":0.92,"status":"completed"}"#;
        match BusEvent::parse(payload) {
            BusEvent::Status(event) => {
                assert_eq!(event.status, JobStatus::Completed);
                assert_eq!(event.chunk_index, Some(2));
                assert_eq!(event.extra["image_similarity"], 0.92);
            }
            BusEvent::Opaque(_) => panic!("expected status event"),
        }
    }

    #[test]
    fn test_malformed_payload_falls_back_to_opaque() {
        let payload = "not json at all";
        match BusEvent::parse(payload) {
            BusEvent::Opaque(raw) => assert_eq!(raw, payload),
            BusEvent::Status(_) => panic!("expected opaque"),
        }

        // Valid JSON without a status field is also opaque.
        match BusEvent::parse(r#"{"hello":"world"}"#) {
            BusEvent::Opaque(_) => {}
            BusEvent::Status(_) => panic!("expected opaque"),
        }
    }

    #[test]
    fn test_status_frame_preserves_fields_and_adds_task_id() {
        let payload = r#"{"status":"failed","chunk_index":0,"message":"boom"}"#;
        let event = match BusEvent::parse(payload) {
            BusEvent::Status(e) => e,
            BusEvent::Opaque(_) => panic!("expected status event"),
        };

        let frame = StreamFrame::Status {
            task_id: "task-1".to_string(),
            event,
        };
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["chunk_index"], 0);
        assert_eq!(value["message"], "boom");
        assert_eq!(value["taskId"], "task-1");
    }

    #[test]
    fn test_synthetic_frames() {
        let complete = StreamFrame::SessionComplete {
            session_id: "s1".to_string(),
            status: JobStatus::Completed,
        };
        let value: Value = serde_json::from_str(&complete.to_json()).unwrap();
        assert_eq!(value["type"], "session_complete");
        assert_eq!(value["sessionId"], "s1");
        assert_eq!(value["status"], "completed");

        let failed = StreamFrame::SessionComplete {
            session_id: "s1".to_string(),
            status: JobStatus::Failed,
        };
        let value: Value = serde_json::from_str(&failed.to_json()).unwrap();
        assert_eq!(value["status"], "failed");

        let timeout = StreamFrame::Timeout {
            session_id: "s1".to_string(),
        };
        let value: Value = serde_json::from_str(&timeout.to_json()).unwrap();
        assert_eq!(value["type"], "timeout");
        assert_eq!(value["status"], "timeout");
    }
}
