//! The message protocol: framing `Message`s (request/response/record/
//! heartbeat) over a `Channel` through a pluggable codec.

pub mod message;
pub mod protocol;

pub use message::Message;
pub use protocol::{MessageProtocol, MessageTransport};
