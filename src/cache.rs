// src/cache.rs
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

pub const POLL_LISTING_KEY: &str = "polls";

pub fn poll_key(id: Uuid) -> String {
    format!("polls:{id}")
}

pub fn results_key(id: Uuid) -> String {
    format!("polls:{id}:results")
}

/// Tells the presentation layer a cached view is stale.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, key: &str);
}

/// Publishes stale keys to whoever subscribed.
#[derive(Debug, Clone)]
pub struct BroadcastInvalidator {
    sender: broadcast::Sender<String>,
}

impl BroadcastInvalidator {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastInvalidator {
    fn default() -> Self {
        Self::new(256)
    }
}

impl CacheInvalidator for BroadcastInvalidator {
    fn invalidate(&self, key: &str) {
        // No receivers is fine: nothing is cached yet.
        let receivers = self.sender.send(key.to_string()).unwrap_or(0);
        debug!(key, receivers, "Cache invalidated");
    }
}
