use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Queue the external worker pool consumes from. Fixed by the broker
/// protocol; workers bind to this exact name.
pub const CELERY_QUEUE: &str = "celery";

/// Inner task message, base64-encoded into the envelope body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskMessage {
    pub id: String,
    pub task: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub retries: u32,
    pub eta: Option<String>,
    pub expires: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskHeaders {
    pub lang: String,
    pub task: String,
    pub id: String,
    pub root_id: String,
    pub parent_id: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskProperties {
    pub correlation_id: String,
    pub reply_to: String,
    /// 2 = persist to disk.
    pub delivery_mode: u8,
    pub delivery_info: DeliveryInfo,
    pub priority: u8,
    pub body_encoding: String,
    pub delivery_tag: String,
}

/// Outer envelope pushed onto the broker queue as one textual message.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub body: String,
    #[serde(rename = "content-encoding")]
    pub content_encoding: String,
    #[serde(rename = "content-type")]
    pub content_type: String,
    pub headers: TaskHeaders,
    pub properties: TaskProperties,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("task arguments not representable as JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Encode one task invocation into the broker wire format.
///
/// Every call generates a fresh task id and a distinct delivery tag. The
/// returned payload is the serialized envelope ready to push onto
/// [`CELERY_QUEUE`].
pub fn encode_task(
    task_name: &str,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
) -> Result<(String, Uuid), CodecError> {
    let task_id = Uuid::new_v4();
    let id = task_id.to_string();

    let message = TaskMessage {
        id: id.clone(),
        task: task_name.to_string(),
        args,
        kwargs,
        retries: 0,
        eta: None,
        expires: None,
    };
    let body = BASE64_STANDARD.encode(serde_json::to_vec(&message)?);

    let envelope = TaskEnvelope {
        body,
        content_encoding: "utf-8".to_string(),
        content_type: "application/json".to_string(),
        headers: TaskHeaders {
            lang: "py".to_string(),
            task: task_name.to_string(),
            id: id.clone(),
            root_id: id.clone(),
            parent_id: None,
            group: None,
        },
        properties: TaskProperties {
            correlation_id: id,
            reply_to: String::new(),
            delivery_mode: 2,
            delivery_info: DeliveryInfo {
                exchange: String::new(),
                routing_key: CELERY_QUEUE.to_string(),
            },
            priority: 0,
            body_encoding: "base64".to_string(),
            delivery_tag: Uuid::new_v4().to_string(),
        },
    };

    Ok((serde_json::to_string(&envelope)?, task_id))
}
