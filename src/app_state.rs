use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::services::{
    bridge::EventBusBridge, dispatcher::TaskDispatcher, media::MediaSplitter, storage::ObjectStore,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: Arc<ObjectStore>,
    pub dispatcher: Arc<TaskDispatcher>,
    pub bridge: Arc<EventBusBridge>,
    pub media: Arc<MediaSplitter>,
    /// Deadline applied to every open progress stream.
    pub stream_timeout: Duration,
}

impl AppState {
    pub fn new(
        db: PgPool,
        storage: ObjectStore,
        dispatcher: TaskDispatcher,
        bridge: EventBusBridge,
        media: MediaSplitter,
        stream_timeout: Duration,
    ) -> Self {
        Self {
            db,
            storage: Arc::new(storage),
            dispatcher: Arc::new(dispatcher),
            bridge: Arc::new(bridge),
            media: Arc::new(media),
            stream_timeout,
        }
    }
}
