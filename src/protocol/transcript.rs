//! Controller-side record of one run
//!
//! Collects the status messages a controller received and checks them
//! against the ordering contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::StatusMessage;

/// Ordering contract violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("no finished message received")]
    MissingFinished,

    #[error("message {index} ({kind}) follows finished")]
    AfterFinished { index: usize, kind: &'static str },

    #[error("ready received {0} times")]
    DuplicateReady(usize),

    #[error("successful run finished without ready")]
    MissingReady,
}

/// Ordered status messages of a single run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub messages: Vec<StatusMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: StatusMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether the terminal message has been recorded
    pub fn is_complete(&self) -> bool {
        self.messages.iter().any(StatusMessage::is_terminal)
    }

    pub fn saw_ready(&self) -> bool {
        self.messages.contains(&StatusMessage::Ready)
    }

    /// Exception carried by `finished`, if any
    pub fn exception(&self) -> Option<&str> {
        self.messages.iter().find_map(|m| match m {
            StatusMessage::Finished { exception } => exception.as_deref(),
            _ => None,
        })
    }

    /// True when the run finished without an exception
    pub fn succeeded(&self) -> bool {
        self.is_complete() && self.exception().is_none()
    }

    /// Text the program wrote, with `writeLine` chunks newline-terminated
    pub fn output(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            match message {
                StatusMessage::Write { message } => out.push_str(message),
                StatusMessage::WriteLine { message } => {
                    out.push_str(message);
                    out.push('\n');
                }
                _ => {}
            }
        }
        out
    }

    /// Wire tags in order, e.g. `["writeLine", "ready", "finished"]`
    pub fn kinds(&self) -> Vec<&'static str> {
        self.messages.iter().map(StatusMessage::kind).collect()
    }

    /// Check the ordering contract
    pub fn validate(&self) -> Result<(), ProtocolViolation> {
        let finished_at = self
            .messages
            .iter()
            .position(StatusMessage::is_terminal)
            .ok_or(ProtocolViolation::MissingFinished)?;

        if let Some(extra) = self.messages.get(finished_at + 1) {
            return Err(ProtocolViolation::AfterFinished {
                index: finished_at + 1,
                kind: extra.kind(),
            });
        }

        let ready_count = self
            .messages
            .iter()
            .filter(|m| **m == StatusMessage::Ready)
            .count();
        if ready_count > 1 {
            return Err(ProtocolViolation::DuplicateReady(ready_count));
        }
        if ready_count == 0 && self.exception().is_none() {
            return Err(ProtocolViolation::MissingReady);
        }

        Ok(())
    }
}

impl FromIterator<StatusMessage> for Transcript {
    fn from_iter<I: IntoIterator<Item = StatusMessage>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_transcript() {
        let transcript: Transcript = vec![
            StatusMessage::write_line("hello"),
            StatusMessage::write("a"),
            StatusMessage::write("b"),
            StatusMessage::Ready,
            StatusMessage::finished(None),
        ]
        .into_iter()
        .collect();

        assert_eq!(transcript.validate(), Ok(()));
        assert!(transcript.succeeded());
        assert!(transcript.saw_ready());
        assert_eq!(transcript.output(), "hello\nab");
    }

    #[test]
    fn test_failure_without_ready_is_valid() {
        let transcript: Transcript = vec![StatusMessage::finished(Some("not found".into()))]
            .into_iter()
            .collect();

        assert_eq!(transcript.validate(), Ok(()));
        assert!(!transcript.succeeded());
        assert_eq!(transcript.exception(), Some("not found"));
    }

    #[test]
    fn test_violations() {
        let missing: Transcript = vec![StatusMessage::Ready].into_iter().collect();
        assert_eq!(missing.validate(), Err(ProtocolViolation::MissingFinished));

        let trailing: Transcript = vec![
            StatusMessage::Ready,
            StatusMessage::finished(None),
            StatusMessage::write("late"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            trailing.validate(),
            Err(ProtocolViolation::AfterFinished {
                index: 2,
                kind: "write"
            })
        );

        let doubled: Transcript = vec![
            StatusMessage::Ready,
            StatusMessage::Ready,
            StatusMessage::finished(None),
        ]
        .into_iter()
        .collect();
        assert_eq!(doubled.validate(), Err(ProtocolViolation::DuplicateReady(2)));

        let unready: Transcript = vec![StatusMessage::finished(None)].into_iter().collect();
        assert_eq!(unready.validate(), Err(ProtocolViolation::MissingReady));
    }
}
