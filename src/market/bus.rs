//! In-process coin event bus

use super::CoinEvent;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Callback invoked for every published event
pub type CoinEventHandler = Arc<dyn Fn(&CoinEvent) + Send + Sync>;

/// Fan-out bus between the detector and its subscribers
///
/// Each handler runs on its own task, so a slow or panicking handler
/// neither delays the publisher nor other handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<CoinEventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for all future events
    pub async fn subscribe(&self, handler: CoinEventHandler) {
        self.handlers.write().await.push(handler);
    }

    /// Number of registered handlers
    pub async fn subscriber_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Deliver an event to every handler
    ///
    /// Returns the delivery tasks; callers may await them or drop them.
    pub async fn publish(&self, event: CoinEvent) -> Vec<JoinHandle<()>> {
        let handlers = self.handlers.read().await.clone();
        tracing::debug!(
            event_type = event.event_type(),
            symbol = %event.coin.symbol,
            handlers = handlers.len(),
            "Publishing coin event"
        );

        let event = Arc::new(event);
        handlers
            .into_iter()
            .map(|handler| {
                let event = Arc::clone(&event);
                tokio::spawn(async move { handler(event.as_ref()) })
            })
            .collect()
    }
}
