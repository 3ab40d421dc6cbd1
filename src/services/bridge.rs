use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};

/// Channel carrying per-task worker status events.
pub const TASK_CHANNEL_PREFIX: &str = "task:status:";
/// Channel carrying job-level status events for one base video.
pub const VIDEO_CHANNEL_PREFIX: &str = "video:status:";

/// Bound on buffered bus messages per subscription. A stalled client applies
/// back-pressure to the relay task instead of growing memory without limit.
const EVENT_BUFFER: usize = 64;

/// One message received on a subscribed channel.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

/// Subscribes to notification channels on the shared bus and relays each
/// received message to exactly one consumer.
///
/// Each subscription owns a dedicated bus connection; subscriptions are never
/// shared across stream sessions.
pub struct EventBusBridge {
    client: redis::Client,
}

impl EventBusBridge {
    pub fn new(redis_url: &str) -> Result<Self, BridgeError> {
        let client = redis::Client::open(redis_url).map_err(BridgeError::SubscriptionFailed)?;
        Ok(Self { client })
    }

    /// Open a subscription covering every channel in `channels`.
    ///
    /// Fails fast with no leaked connection if the bus is unreachable or any
    /// subscribe is rejected; the relay task only spawns once all channels
    /// are established.
    pub async fn subscribe(&self, channels: Vec<String>) -> Result<BridgeSubscription, BridgeError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(BridgeError::SubscriptionFailed)?;
        for channel in &channels {
            pubsub
                .subscribe(channel)
                .await
                .map_err(BridgeError::SubscriptionFailed)?;
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    next = messages.next() => {
                        let Some(msg) = next else { break };
                        let Ok(payload) = msg.get_payload::<String>() else { continue };
                        let message = BusMessage {
                            channel: msg.get_channel_name().to_string(),
                            payload,
                        };
                        tokio::select! {
                            _ = &mut shutdown_rx => break,
                            sent = tx.send(message) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            // Dropping the pubsub stream releases the channel subscriptions
            // and the underlying connection.
        });

        tracing::debug!(channels = channels.len(), "Bus subscription opened");

        Ok(BridgeSubscription {
            events: rx,
            guard: BridgeGuard::new(shutdown_tx),
        })
    }
}

/// A live subscription: a stream of [`BusMessage`]s plus the teardown guard.
pub struct BridgeSubscription {
    events: mpsc::Receiver<BusMessage>,
    guard: BridgeGuard,
}

impl BridgeSubscription {
    /// Receive the next relayed message. `None` means the bus side of the
    /// subscription is gone (closed or transport error).
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.events.recv().await
    }

    /// Release the channel subscriptions and the bus connection. Idempotent:
    /// every exit path may call this, only the first has any effect.
    pub fn close(&mut self) {
        self.guard.close();
    }

    pub(crate) fn from_parts(events: mpsc::Receiver<BusMessage>, guard: BridgeGuard) -> Self {
        Self { events, guard }
    }
}

/// Owns the shutdown signal for one subscription's relay task.
///
/// `close` consumes the signal via `Option::take`, so repeated calls and the
/// `Drop` fallback cannot tear down twice. Dropping the guard (e.g. a client
/// disconnect dropping the stream mid-flight) closes the subscription too.
pub struct BridgeGuard {
    shutdown: Option<oneshot::Sender<()>>,
}

impl BridgeGuard {
    pub(crate) fn new(shutdown: oneshot::Sender<()>) -> Self {
        Self {
            shutdown: Some(shutdown),
        }
    }

    pub fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            // The relay task may already be gone; that is fine.
            let _ = tx.send(());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_none()
    }
}

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bus subscription failed: {0}")]
    SubscriptionFailed(#[from] redis::RedisError),
}
