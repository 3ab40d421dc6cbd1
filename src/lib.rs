//! Chunked Video Job Orchestration & Progress Fan-Out
//!
//! This library coordinates long-running, chunk-parallelized video jobs:
//! uploaded videos are split into fixed-duration segments, one task per
//! segment is handed to an external worker pool over a durable broker queue,
//! and any number of clients can watch progress live over SSE until every
//! segment reaches a terminal state.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
