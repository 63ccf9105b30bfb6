// smartmark/src/domain/subscription.rs
//! Listener registrations handed out by a session provider.
//!
//! A `Subscription` pairs the receiving end of a push channel with the handle
//! that deregisters the listener. `unsubscribe` consumes the subscription, so
//! the handle is released exactly once; dropping it releases it as well.

use std::fmt;
use tokio::sync::mpsc;

/// Deregistration handle; runs its release action at most once
pub struct Registration {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Registration with nothing to release
    pub fn detached() -> Self {
        Self { release: None }
    }

    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    registration: Registration,
}

impl<T> Subscription<T> {
    pub fn new(receiver: mpsc::UnboundedReceiver<T>, registration: Registration) -> Self {
        Self {
            receiver,
            registration,
        }
    }

    /// Next notification; `None` once the provider side is gone
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Already-delivered notification, if any, without waiting
    pub fn try_next(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        let Self {
            mut receiver,
            registration,
        } = self;
        receiver.close();
        registration.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn given_registration_when_released_then_action_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let registration = Registration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        registration.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn given_registration_when_dropped_then_action_runs() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        {
            let _registration = Registration::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn given_subscription_when_sender_publishes_then_next_yields_value() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscription = Subscription::new(rx, Registration::detached());
        tx.send(42).unwrap();
        assert_eq!(subscription.next().await, Some(42));
        drop(tx);
        assert_eq!(subscription.next().await, None);
    }
}
