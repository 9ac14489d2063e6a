use std::collections::HashMap;
use std::sync::Mutex;

use shared::events::ServerEvent;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events queued for one display before it is considered stalled.
const SUBSCRIBER_QUEUE: usize = 256;

/// Fan-out of server events. The spin coordinator only sees this trait.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: &ServerEvent);
}

/// A live subscription; serialized events arrive on `receiver` in publish order.
pub struct Subscription {
    pub id: Uuid,
    pub receiver: mpsc::Receiver<String>,
}

/// Best-effort hub over in-process channels, independent of the transport
/// that drains them. A subscriber whose receiver is gone, or whose queue is
/// full, is dropped on the next publish.
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<String>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        let id = Uuid::new_v4();
        let count = {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            subscribers.insert(id, tx);
            subscribers.len()
        };
        info!("📺 Display {} connected. Total displays: {}", id, count);
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if subscribers.remove(&id).is_some() {
            info!("📴 Display {} disconnected. Total displays: {}", id, subscribers.len());
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Broadcaster for BroadcastHub {
    fn publish(&self, event: &ServerEvent) {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode {} event: {}", event.kind(), e);
                return;
            }
        };

        // Sending under the lock keeps per-subscriber order equal to publish order.
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if subscribers.is_empty() {
            return;
        }
        debug!("Broadcasting {} to {} displays", event.kind(), subscribers.len());
        subscribers.retain(|id, tx| match tx.try_send(text.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Dropping stalled display {}", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                info!("Dropping unreachable display {}", id);
                false
            }
        });
    }
}
