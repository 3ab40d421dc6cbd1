use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;

use crate::models::event::{BusEvent, StreamFrame};
use crate::models::job::JobStatus;
use crate::services::aggregator::ChunkAggregator;
use crate::services::bridge::{BridgeSubscription, BusMessage, TASK_CHANNEL_PREFIX};

/// One long-lived client connection fed from a bus subscription.
///
/// The session relays every bus message to the outgoing stream, folds
/// terminal chunk events into its aggregator, and closes exactly once on
/// whichever trigger fires first: aggregate completion, the session
/// deadline, or client disconnect (the stream being dropped). The terminal
/// frame is always the last frame emitted.
pub struct StreamSession {
    session_id: String,
    /// Task ids in chunk order; the position of a task id is its chunk
    /// ordinal for aggregation. Empty in passthrough mode.
    task_ids: Vec<String>,
    aggregator: Option<ChunkAggregator>,
    subscription: BridgeSubscription,
    timeout: Duration,
}

impl StreamSession {
    /// Session aggregating one channel per dispatched task, completing once
    /// `total_chunks` distinct tasks report a terminal status.
    pub fn for_tasks(
        session_id: String,
        task_ids: Vec<String>,
        total_chunks: usize,
        subscription: BridgeSubscription,
        timeout: Duration,
    ) -> Self {
        Self {
            session_id,
            task_ids,
            aggregator: Some(ChunkAggregator::new(total_chunks)),
            subscription,
            timeout,
        }
    }

    /// Passthrough session over a single job-level channel; ends only on
    /// timeout or disconnect.
    pub fn for_channel(session_id: String, subscription: BridgeSubscription, timeout: Duration) -> Self {
        Self {
            session_id,
            task_ids: Vec::new(),
            aggregator: None,
            subscription,
            timeout,
        }
    }

    /// Turn one received bus message into an outgoing frame, folding terminal
    /// statuses into the aggregator. Returns the frame and whether the
    /// session aggregate is now complete.
    fn relay(&mut self, msg: BusMessage) -> (StreamFrame, bool) {
        let task_id = msg
            .channel
            .strip_prefix(TASK_CHANNEL_PREFIX)
            .filter(|id| self.task_ids.iter().any(|t| t == id))
            .map(str::to_string);

        let Some(task_id) = task_id else {
            // No task mapping for this channel: relay verbatim.
            return (StreamFrame::Opaque(msg.payload), false);
        };

        match BusEvent::parse(&msg.payload) {
            BusEvent::Status(event) => {
                let ordinal = self.task_ids.iter().position(|t| *t == task_id);
                let complete = match (&mut self.aggregator, ordinal) {
                    (Some(agg), Some(chunk)) => agg.observe(chunk, event.status),
                    _ => false,
                };
                (StreamFrame::Status { task_id, event }, complete)
            }
            BusEvent::Opaque(raw) => (StreamFrame::Opaque(raw), false),
        }
    }

    /// Consume the session into a stream of JSON frame payloads.
    ///
    /// Dropping the returned stream (client disconnect) tears the bus
    /// subscription down through the bridge guard without emitting a
    /// synthetic frame; the armed deadline is dropped with it, so no late
    /// timeout frame can fire.
    pub fn into_frames(mut self) -> impl Stream<Item = String> {
        stream! {
            metrics::counter!("stream_sessions_opened").increment(1);
            tracing::debug!(session_id = %self.session_id, channels = self.task_ids.len().max(1), "Stream session opened");

            let deadline = tokio::time::sleep(self.timeout);
            tokio::pin!(deadline);

            enum Step {
                Deadline,
                Message(Option<BusMessage>),
            }

            let final_frame = loop {
                let step = tokio::select! {
                    _ = &mut deadline => Step::Deadline,
                    next = self.subscription.recv() => Step::Message(next),
                };

                match step {
                    Step::Deadline => {
                        metrics::counter!("stream_sessions_timed_out").increment(1);
                        break StreamFrame::Timeout { session_id: self.session_id.clone() };
                    }
                    // Bus side gone mid-stream: absorbed into a terminal
                    // frame, the client connection is the only consumer left.
                    Step::Message(None) => {
                        break StreamFrame::Timeout { session_id: self.session_id.clone() };
                    }
                    Step::Message(Some(msg)) => {
                        let (frame, complete) = self.relay(msg);
                        yield frame.to_json();
                        if complete {
                            let status = match &self.aggregator {
                                Some(agg) if agg.any_failed() => JobStatus::Failed,
                                _ => JobStatus::Completed,
                            };
                            break StreamFrame::SessionComplete {
                                session_id: self.session_id.clone(),
                                status,
                            };
                        }
                    }
                }
            };

            yield final_frame.to_json();
            self.subscription.close();
            metrics::counter!("stream_sessions_closed").increment(1);
            tracing::debug!(session_id = %self.session_id, "Stream session closed");
        }
    }
}
