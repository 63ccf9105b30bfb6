// smartmark/src/presentation/lifetime.rs
//! Page lifetime token.
//!
//! Work started by the page carries a `LifetimeToken`. Once the page ends,
//! guarded futures resolve to `None` and their results are never applied.

use std::future::Future;
use tokio::sync::watch;

#[derive(Debug)]
pub struct Lifetime {
    ended: watch::Sender<bool>,
}

impl Lifetime {
    pub fn new() -> Self {
        let (ended, _) = watch::channel(false);
        Self { ended }
    }

    pub fn token(&self) -> LifetimeToken {
        LifetimeToken {
            ended: self.ended.subscribe(),
        }
    }

    pub fn end(&self) {
        self.ended.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.borrow()
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

/// Observes a `Lifetime`; a dropped `Lifetime` counts as ended
#[derive(Debug, Clone)]
pub struct LifetimeToken {
    ended: watch::Receiver<bool>,
}

impl LifetimeToken {
    pub fn is_alive(&self) -> bool {
        !*self.ended.borrow() && self.ended.has_changed().is_ok()
    }

    pub async fn ended(&mut self) {
        let _ = self.ended.wait_for(|ended| *ended).await;
    }

    /// Runs `work` unless the lifetime ends first
    pub async fn guard<F: Future>(mut self, work: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.ended() => None,
            output = work => self.is_alive().then_some(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn given_live_lifetime_when_guarded_work_completes_then_output() {
        let lifetime = Lifetime::new();
        assert_eq!(lifetime.token().guard(async { 5 }).await, Some(5));
    }

    #[tokio::test]
    async fn given_ended_lifetime_when_guarded_then_none() {
        let lifetime = Lifetime::new();
        let token = lifetime.token();
        lifetime.end();
        assert!(lifetime.is_ended());
        assert_eq!(token.guard(async { 5 }).await, None);
    }

    #[tokio::test]
    async fn given_pending_work_when_lifetime_ends_then_guard_returns_none() {
        let lifetime = Lifetime::new();
        let token = lifetime.token();
        let work = tokio::spawn(token.guard(tokio::time::sleep(Duration::from_secs(60))));
        lifetime.end();
        assert_eq!(work.await.unwrap(), None);
    }

    #[tokio::test]
    async fn given_dropped_lifetime_then_token_not_alive() {
        let lifetime = Lifetime::new();
        let token = lifetime.token();
        drop(lifetime);
        assert!(!token.is_alive());
        assert_eq!(token.guard(async { 1 }).await, None);
    }
}
