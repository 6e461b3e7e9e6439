use beam_serialize::{ReceiveError, ReceiveResult, Receiver, Sender};

/// The four wire-level message kinds `MessageProtocol` carries
/// (`Services/Message.hpp`'s `RequestMessage`/`ResponseMessage`/
/// `RecordMessage` plus the heartbeat Beam adds at this layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A call expecting exactly one `Response` bearing the same
    /// `request_id`.
    Request { request_id: i32, type_tag: u32, body: Vec<u8> },
    /// The answer to a `Request`. `is_exception` selects whether `body`
    /// holds the successful payload or a serialized
    /// `ServiceRequestException`.
    Response { request_id: i32, is_exception: bool, type_tag: u32, body: Vec<u8> },
    /// A one-way message with no response expected.
    Record { type_tag: u32, body: Vec<u8> },
    /// An empty keep-alive, sent on a timer and on any outgoing traffic
    /// reset (`Services/ServiceProtocolClient.hpp`'s heartbeat timer).
    Heartbeat,
}

const KIND_REQUEST: u8 = 0;
const KIND_RESPONSE: u8 = 1;
const KIND_RECORD: u8 = 2;
const KIND_HEARTBEAT: u8 = 3;

impl Message {
    pub fn send<S: Sender>(&self, sender: &mut S) {
        match self {
            Message::Request { request_id, type_tag, body } => {
                sender.send_u8(KIND_REQUEST);
                sender.send_i32(*request_id);
                sender.send_u32(*type_tag);
                sender.send_u32(body.len() as u32);
                sender.send_bytes(body);
            }
            Message::Response { request_id, is_exception, type_tag, body } => {
                sender.send_u8(KIND_RESPONSE);
                sender.send_i32(*request_id);
                sender.send_bool(*is_exception);
                sender.send_u32(*type_tag);
                sender.send_u32(body.len() as u32);
                sender.send_bytes(body);
            }
            Message::Record { type_tag, body } => {
                sender.send_u8(KIND_RECORD);
                sender.send_u32(*type_tag);
                sender.send_u32(body.len() as u32);
                sender.send_bytes(body);
            }
            Message::Heartbeat => {
                sender.send_u8(KIND_HEARTBEAT);
            }
        }
    }

    pub fn receive<R: Receiver>(receiver: &mut R) -> ReceiveResult<Self> {
        let kind = receiver.receive_u8()?;
        match kind {
            KIND_REQUEST => {
                let request_id = receiver.receive_i32()?;
                let type_tag = receiver.receive_u32()?;
                let len = receiver.receive_u32()? as usize;
                let body = receiver.receive_bytes(len)?;
                Ok(Message::Request { request_id, type_tag, body })
            }
            KIND_RESPONSE => {
                let request_id = receiver.receive_i32()?;
                let is_exception = receiver.receive_bool()?;
                let type_tag = receiver.receive_u32()?;
                let len = receiver.receive_u32()? as usize;
                let body = receiver.receive_bytes(len)?;
                Ok(Message::Response { request_id, is_exception, type_tag, body })
            }
            KIND_RECORD => {
                let type_tag = receiver.receive_u32()?;
                let len = receiver.receive_u32()? as usize;
                let body = receiver.receive_bytes(len)?;
                Ok(Message::Record { type_tag, body })
            }
            KIND_HEARTBEAT => Ok(Message::Heartbeat),
            other => Err(ReceiveError::Malformed(format!("unknown message kind {}", other))),
        }
    }
}
