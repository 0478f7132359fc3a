// crates/mana-tracker/src/events.rs
//
// Balance events and the subscriber registry that receives them.
//
// Subscribers are keyed by an id issued at registration, so the same
// callback can be registered twice and removed independently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use mana_core::{IdentityId, Mana, Timestamp};

/// Events emitted by the tracker after a transfer is booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BalanceEvent {
    /// A transfer was applied to an identity's balance.
    Updated {
        identity: IdentityId,
        /// Balance after the transfer and any replays.
        value: Mana,
        last_erosion: Timestamp,
        /// Entries rolled back and replayed to keep canonical order.
        rolled_back: usize,
    },
    /// Retention folded old history entries into the checkpoint.
    Pruned {
        identity: IdentityId,
        dropped: usize,
        checkpoint_time: Timestamp,
    },
}

/// Handle returned by `BalanceEvents::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&BalanceEvent) + Send + Sync>;

/// Ordered list of balance event subscribers.
#[derive(Default)]
pub struct BalanceEvents {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Callback)>>,
}

impl BalanceEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&BalanceEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Deliver `event` to every subscriber in registration order.
    ///
    /// Callbacks run outside the registry lock and may subscribe or
    /// unsubscribe; changes take effect from the next event.
    pub fn publish(&self, event: &BalanceEvent) {
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn updated(value: Mana) -> BalanceEvent {
        BalanceEvent::Updated {
            identity: IdentityId::new([1u8; 32]),
            value,
            last_erosion: 0,
            rolled_back: 0,
        }
    }

    #[test]
    fn test_publish_in_registration_order() {
        let events = BalanceEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let seen = Arc::clone(&seen);
            events.subscribe(move |_| seen.lock().unwrap().push(label));
        }

        events.publish(&updated(1));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_ids_are_distinct_for_same_callback() {
        let events = BalanceEvents::new();
        let count = Arc::new(AtomicU64::new(0));
        let callback = {
            let count = Arc::clone(&count);
            move |_: &BalanceEvent| {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };

        let a = events.subscribe(callback.clone());
        let b = events.subscribe(callback);
        assert_ne!(a, b);

        assert!(events.unsubscribe(a));
        events.publish(&updated(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(events.subscriber_count(), 1);
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let events = BalanceEvents::new();
        let id = events.subscribe(|_| {});
        assert!(events.unsubscribe(id));
        assert!(!events.unsubscribe(id));
    }

    #[test]
    fn test_callback_may_subscribe_during_publish() {
        let events = Arc::new(BalanceEvents::new());
        let inner = Arc::clone(&events);
        events.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        events.publish(&updated(1));
        assert_eq!(events.subscriber_count(), 2);
    }
}
