//! Wire messages exchanged between controller and worker
//!
//! Defines the launch request and the status messages, with their exact
//! JSON shapes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lifecycle::{codec, MarshalHooks};

/// Controller → worker: load `scripts` in order, then run `exe` with `args`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LaunchRequest {
    /// Test program identifier
    pub exe: String,

    /// Resources to load before resolving `exe`, in order
    #[serde(default)]
    pub scripts: Vec<String>,

    /// Arguments passed to the program's run operation
    #[serde(default)]
    pub args: Vec<String>,
}

impl LaunchRequest {
    pub fn new(exe: impl Into<String>) -> Self {
        Self {
            exe: exe.into(),
            scripts: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.scripts.push(script.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Decode from a single JSON document
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        codec::unmarshal(input)
    }

    /// Encode as a single-line JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        codec::marshal(&mut self.clone())
    }
}

impl MarshalHooks for LaunchRequest {}

impl fmt::Display for LaunchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.exe)?;
        if !self.scripts.is_empty() {
            write!(f, " [{}]", self.scripts.join(", "))?;
        }
        Ok(())
    }
}

/// Worker → controller status message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum StatusMessage {
    /// Raw text chunk
    #[serde(rename = "write")]
    Write { message: String },

    /// Text chunk followed by a newline
    #[serde(rename = "writeLine")]
    WriteLine { message: String },

    /// The program finished setup and can be observed
    #[serde(rename = "ready")]
    Ready,

    /// Terminal message; `exception` is present iff the run failed
    #[serde(rename = "finished")]
    Finished {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exception: Option<String>,
    },
}

impl StatusMessage {
    pub fn write(message: impl Into<String>) -> Self {
        StatusMessage::Write {
            message: message.into(),
        }
    }

    pub fn write_line(message: impl Into<String>) -> Self {
        StatusMessage::WriteLine {
            message: message.into(),
        }
    }

    pub fn finished(exception: Option<String>) -> Self {
        StatusMessage::Finished { exception }
    }

    /// Wire tag of this message
    pub fn kind(&self) -> &'static str {
        match self {
            StatusMessage::Write { .. } => "write",
            StatusMessage::WriteLine { .. } => "writeLine",
            StatusMessage::Ready => "ready",
            StatusMessage::Finished { .. } => "finished",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusMessage::Finished { .. })
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        codec::unmarshal(input)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        codec::marshal(&mut self.clone())
    }
}

impl MarshalHooks for StatusMessage {}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Write { message } | StatusMessage::WriteLine { message } => {
                write!(f, "{}({message:?})", self.kind())
            }
            StatusMessage::Ready => write!(f, "ready"),
            StatusMessage::Finished { exception: None } => write!(f, "finished"),
            StatusMessage::Finished {
                exception: Some(exception),
            } => write!(f, "finished({exception:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_launch_request_wire_shape() {
        let request = LaunchRequest::new("Good")
            .with_script("good.mod")
            .with_arg("--fast");

        let value: serde_json::Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"exe": "Good", "scripts": ["good.mod"], "args": ["--fast"]})
        );
    }

    #[test]
    fn test_launch_request_defaults() {
        let request = LaunchRequest::from_json(r#"{"exe": "Missing"}"#).unwrap();
        assert_eq!(request.exe, "Missing");
        assert!(request.scripts.is_empty());
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_status_wire_shapes() {
        let cases = [
            (
                StatusMessage::write("abc"),
                json!({"type": "write", "message": "abc"}),
            ),
            (
                StatusMessage::write_line("hello"),
                json!({"type": "writeLine", "message": "hello"}),
            ),
            (StatusMessage::Ready, json!({"type": "ready"})),
            (StatusMessage::finished(None), json!({"type": "finished"})),
            (
                StatusMessage::finished(Some("boom".into())),
                json!({"type": "finished", "exception": "boom"}),
            ),
        ];

        for (message, expected) in cases {
            let encoded: serde_json::Value =
                serde_json::from_str(&message.to_json().unwrap()).unwrap();
            assert_eq!(encoded, expected, "{message}");
        }
    }

    #[test]
    fn test_status_decode_from_controller_text() {
        let message = StatusMessage::from_json(r#"{"type":"finished","exception":"boom"}"#).unwrap();
        assert_eq!(message, StatusMessage::finished(Some("boom".into())));
        assert!(message.is_terminal());

        assert!(StatusMessage::from_json(r#"{"type":"shout"}"#).is_err());
    }
}
