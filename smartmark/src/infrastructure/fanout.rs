// smartmark/src/infrastructure/fanout.rs
use crate::domain::subscription::{Registration, Subscription};
use crate::infrastructure::lock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::trace;

struct Listeners<T> {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<T>>,
}

/// In-process push channel with individually removable listeners
pub struct Fanout<T> {
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T: Clone + Send + 'static> Fanout<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                senders: HashMap::new(),
            })),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut listeners = lock(&self.listeners);
            listeners.next_id += 1;
            let id = listeners.next_id;
            listeners.senders.insert(id, tx);
            id
        };
        trace!("Registered listener {}", id);

        let weak = Arc::downgrade(&self.listeners);
        let registration = Registration::new(move || {
            if let Some(listeners) = weak.upgrade() {
                lock(&listeners).senders.remove(&id);
                trace!("Released listener {}", id);
            }
        });
        Subscription::new(rx, registration)
    }

    /// Delivers to every live listener and returns how many received it.
    /// Listeners whose receiving end is gone are dropped on the way.
    pub fn publish(&self, value: T) -> usize {
        let mut listeners = lock(&self.listeners);
        listeners
            .senders
            .retain(|_, sender| sender.send(value.clone()).is_ok());
        listeners.senders.len()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).senders.len()
    }
}

impl<T: Clone + Send + 'static> Default for Fanout<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Fanout<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T> fmt::Debug for Fanout<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fanout")
            .field("listeners", &lock(&self.listeners).senders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn given_two_listeners_when_publish_then_both_receive() {
        let fanout = Fanout::new();
        let mut a = fanout.subscribe();
        let mut b = fanout.subscribe();

        assert_eq!(fanout.publish("hello"), 2);
        assert_eq!(a.next().await, Some("hello"));
        assert_eq!(b.next().await, Some("hello"));
    }

    #[tokio::test]
    async fn given_unsubscribed_listener_when_publish_then_not_delivered() {
        let fanout = Fanout::new();
        let a = fanout.subscribe();
        let mut b = fanout.subscribe();
        a.unsubscribe();

        assert_eq!(fanout.listener_count(), 1);
        assert_eq!(fanout.publish(7), 1);
        assert_eq!(b.next().await, Some(7));
    }

    #[test]
    fn given_dropped_listener_when_publish_then_pruned() {
        let fanout = Fanout::new();
        drop(fanout.subscribe());
        assert_eq!(fanout.publish(1u8), 0);
        assert_eq!(fanout.listener_count(), 0);
    }
}
