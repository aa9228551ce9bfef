//! One-shot readiness signal

use std::sync::Arc;
use tokio::sync::watch;

/// Single-resolution signal raised by a program once its setup is done.
///
/// Clones share state. Signalling again after the first time has no effect;
/// waiting before the first signal suspends the caller.
#[derive(Clone, Debug)]
pub struct Readiness {
    tx: Arc<watch::Sender<bool>>,
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve the signal. Returns true only for the resolving call.
    pub fn signal(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_signaled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal resolves
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_wait_suspends_until_signal() {
        let readiness = Readiness::new();
        let mut waiter = task::spawn(readiness.wait());

        assert_pending!(waiter.poll());
        assert!(readiness.signal());
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
    }

    #[test]
    fn test_second_signal_has_no_effect() {
        let readiness = Readiness::new();
        let clone = readiness.clone();

        assert!(!readiness.is_signaled());
        assert!(clone.signal());
        assert!(!readiness.signal());
        assert!(readiness.is_signaled());
    }

    #[test]
    fn test_wait_after_signal_completes_immediately() {
        let readiness = Readiness::new();
        readiness.signal();

        let mut waiter = task::spawn(readiness.wait());
        assert_ready!(waiter.poll());
    }
}
