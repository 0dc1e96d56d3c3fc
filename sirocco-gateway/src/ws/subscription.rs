//! Channel subscription registry.
//!
//! The registry is the ground truth for what the session is subscribed to:
//! mutations happen before the corresponding control frame is written, and
//! reconnection resubscribes exactly the channels recorded here. Server
//! acknowledgements are informational and never reconciled against it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use sirocco_core::error::Result;

/// Handler invoked with the full raw bytes of each data frame on its
/// channel. Handlers parse their own payload shape.
pub type SubscriptionHandler = Arc<dyn Fn(&[u8]) -> Result<()> + Send + Sync>;

/// Thread-safe channel → handler map. Read by the reader task for dispatch,
/// written by caller threads on subscribe/unsubscribe.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<String, SubscriptionHandler>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any previous handler on the channel.
    /// Returns the replaced handler, if any.
    pub fn add(&self, channel: impl Into<String>, handler: SubscriptionHandler) -> Option<SubscriptionHandler> {
        self.subscriptions.write().insert(channel.into(), handler)
    }

    /// Removes a channel. Returns the removed handler, if any.
    pub fn remove(&self, channel: &str) -> Option<SubscriptionHandler> {
        self.subscriptions.write().remove(channel)
    }

    /// Returns the handler for a channel.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<SubscriptionHandler> {
        self.subscriptions.read().get(channel).cloned()
    }

    /// Returns every subscribed channel name.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.subscriptions.read().keys().cloned().collect()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        self.subscriptions.write().clear();
    }

    /// Returns the number of subscriptions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Returns true when a channel is subscribed.
    #[must_use]
    pub fn exists(&self, channel: &str) -> bool {
        self.subscriptions.read().contains_key(channel)
    }

    /// Returns true when no channel is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn noop_handler() -> SubscriptionHandler {
        Arc::new(|_: &[u8]| Ok(()))
    }

    #[test]
    fn test_add_get_remove() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.add("account", noop_handler()).is_none());
        assert!(registry.exists("account"));
        assert!(registry.get("account").is_some());
        assert_eq!(registry.count(), 1);

        assert!(registry.remove("account").is_some());
        assert!(!registry.exists("account"));
        assert!(registry.remove("account").is_none());
    }

    #[test]
    fn test_add_replaces_handler() {
        let registry = SubscriptionRegistry::new();
        let calls = Arc::new(AtomicU32::new(0));

        let first_calls = Arc::clone(&calls);
        registry.add(
            "orders",
            Arc::new(move |_: &[u8]| {
                first_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let second_calls = Arc::clone(&calls);
        let replaced = registry.add(
            "orders",
            Arc::new(move |_: &[u8]| {
                second_calls.fetch_add(100, Ordering::SeqCst);
                Ok(())
            }),
        );
        assert!(replaced.is_some());
        assert_eq!(registry.count(), 1);

        registry.get("orders").unwrap()(b"{}").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_channels_enumeration() {
        let registry = SubscriptionRegistry::new();
        registry.add("orders", noop_handler());
        registry.add("fill", noop_handler());

        let mut channels = registry.channels();
        channels.sort();
        assert_eq!(channels, vec!["fill", "orders"]);

        registry.clear();
        assert!(registry.channels().is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let registry = Arc::new(SubscriptionRegistry::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let channel = format!("channel-{}", (i * 100 + j) % 10);
                    registry.add(channel.clone(), Arc::new(|_: &[u8]| Ok(())));
                    let _ = registry.get(&channel);
                    let _ = registry.channels();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.count(), 10);
    }
}
