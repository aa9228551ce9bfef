//! Output redirection for test programs

use crate::protocol::StatusSender;

/// Forwards a program's text output to the controller.
///
/// Both operations are fire-and-forget; nothing is returned and nothing can
/// fail from the caller's point of view.
#[derive(Clone, Debug)]
pub struct OutputSink {
    status: StatusSender,
}

impl OutputSink {
    pub fn new(status: StatusSender) -> Self {
        Self { status }
    }

    pub fn write(&self, message: impl Into<String>) {
        self.status.write(message);
    }

    pub fn write_line(&self, message: impl Into<String>) {
        self.status.write_line(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{status_channel, StatusMessage};

    #[test]
    fn test_sink_forwards_matching_tags() {
        let (tx, mut rx) = status_channel();
        let sink = OutputSink::new(tx);

        sink.write("partial");
        sink.write_line("line");

        assert_eq!(rx.try_recv(), Some(StatusMessage::write("partial")));
        assert_eq!(rx.try_recv(), Some(StatusMessage::write_line("line")));
        assert_eq!(rx.try_recv(), None);
    }
}
