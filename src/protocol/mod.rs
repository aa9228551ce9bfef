//! Controller channel
//!
//! Message schema, the ordered status channel, and controller-side
//! transcript validation.

mod channel;
mod messages;
mod transcript;

pub use channel::{status_channel, StatusReceiver, StatusSender};
pub use messages::{LaunchRequest, StatusMessage};
pub use transcript::{ProtocolViolation, Transcript};
