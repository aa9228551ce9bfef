//! Status channel from an execution context to its controller
//!
//! The sending half enforces the ordering contract for one run: any number
//! of output messages, at most one `ready`, exactly one `finished`, and
//! nothing after `finished`.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::messages::StatusMessage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Starting,
    Ready,
    Finished,
}

/// Create a fresh status channel for one run
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = StatusSender {
        tx,
        phase: Arc::new(Mutex::new(Phase::Starting)),
    };
    (sender, StatusReceiver { rx })
}

/// Context-side half of the status channel.
///
/// Cheap to clone; every clone shares the same run phase.
#[derive(Clone, Debug)]
pub struct StatusSender {
    tx: mpsc::UnboundedSender<StatusMessage>,
    phase: Arc<Mutex<Phase>>,
}

impl StatusSender {
    /// Enqueue a raw text chunk
    pub fn write(&self, message: impl Into<String>) {
        self.emit_output(StatusMessage::write(message));
    }

    /// Enqueue a text chunk followed by a newline
    pub fn write_line(&self, message: impl Into<String>) {
        self.emit_output(StatusMessage::write_line(message));
    }

    /// Emit `ready`. Returns false if it was already sent or the run finished.
    pub fn ready(&self) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != Phase::Starting {
            debug!("Ignoring ready in phase {:?}", *phase);
            return false;
        }
        *phase = Phase::Ready;
        self.send(StatusMessage::Ready);
        true
    }

    /// Emit the terminal `finished`. Returns false if it was already sent.
    pub fn finish(&self, exception: Option<String>) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase == Phase::Finished {
            debug!("Ignoring second finished");
            return false;
        }
        *phase = Phase::Finished;
        self.send(StatusMessage::finished(exception));
        true
    }

    pub fn is_ready(&self) -> bool {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) == Phase::Ready
    }

    pub fn is_finished(&self) -> bool {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) == Phase::Finished
    }

    fn emit_output(&self, message: StatusMessage) {
        let phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase == Phase::Finished {
            debug!("Dropping {} emitted after finished", message.kind());
            return;
        }
        self.send(message);
    }

    fn send(&self, message: StatusMessage) {
        trace!("-> {}", message);
        // A controller that stopped listening is not an error for the run.
        if self.tx.send(message).is_err() {
            debug!("Controller side of status channel is closed");
        }
    }
}

/// Controller-side half of the status channel
#[derive(Debug)]
pub struct StatusReceiver {
    rx: mpsc::UnboundedReceiver<StatusMessage>,
}

impl StatusReceiver {
    /// Next message, or `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<StatusMessage> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<StatusMessage> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut StatusReceiver) -> Vec<StatusMessage> {
        std::iter::from_fn(|| rx.try_recv()).collect()
    }

    #[test]
    fn test_messages_keep_emission_order() {
        let (tx, mut rx) = status_channel();
        tx.write("a");
        tx.write_line("b");
        assert!(tx.ready());
        tx.write("c");
        assert!(tx.finish(None));

        assert_eq!(
            drain(&mut rx),
            vec![
                StatusMessage::write("a"),
                StatusMessage::write_line("b"),
                StatusMessage::Ready,
                StatusMessage::write("c"),
                StatusMessage::finished(None),
            ]
        );
    }

    #[test]
    fn test_ready_is_sent_once() {
        let (tx, mut rx) = status_channel();
        let other = tx.clone();
        assert!(tx.ready());
        assert!(!other.ready());
        assert!(other.is_ready());

        assert_eq!(drain(&mut rx), vec![StatusMessage::Ready]);
    }

    #[test]
    fn test_nothing_follows_finished() {
        let (tx, mut rx) = status_channel();
        assert!(tx.finish(Some("boom".into())));
        tx.write_line("late");
        assert!(!tx.ready());
        assert!(!tx.finish(None));
        assert!(tx.is_finished());

        assert_eq!(
            drain(&mut rx),
            vec![StatusMessage::finished(Some("boom".into()))]
        );
    }

    #[tokio::test]
    async fn test_receiver_ends_when_senders_drop() {
        let (tx, mut rx) = status_channel();
        tx.write("x");
        drop(tx);

        assert_eq!(rx.recv().await, Some(StatusMessage::write("x")));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_send_after_receiver_drop_is_silent() {
        let (tx, rx) = status_channel();
        drop(rx);
        tx.write("ignored");
        assert!(tx.ready());
        assert!(tx.finish(None));
    }
}
