pub mod aggregator;
pub mod bridge;
pub mod celery;
pub mod dispatcher;
pub mod media;
pub mod session;
pub mod storage;
