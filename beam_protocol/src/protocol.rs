use crate::message::Message;
use async_trait::async_trait;
use beam_buffer::error::IoResult;
use beam_buffer::AsyncWriter;
use beam_channel::Channel;
use beam_codec::{CodedReader, CodedWriter, Decoder, Encoder};
use beam_serialize::{shuttle_clone, ReceiveResult, Shuttle};
use tokio::sync::Mutex;

/// Type-erased send/receive surface a `MessageProtocol<C, E, D>` presents
/// to anything above it. `ServiceProtocolClient` holds a `dyn
/// MessageTransport` rather than being generic over `C`/`E`/`D` itself —
/// the one place in the service layer where a trait object crosses a
/// template boundary the source expressed with `BufferRef`/`EncoderBox`
/// (see design notes).
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &Message) -> IoResult<()>;
    async fn receive(&self) -> IoResult<Message>;
}

/// Frames, encodes and decodes `Message`s over one `Channel`
/// (`Services/MessageProtocol.hpp`). `Encode`s via `E`, writes through an
/// `AsyncWriter` so concurrent callers never interleave partial frames,
/// and additionally serializes the encode-then-submit step behind a
/// mutex so two racing `send` calls can't reorder relative to each other
/// between encoding and submission. The receive side is also behind a
/// mutex: only one logical reader ever calls `receive` (the servlet
/// dispatch loop), so the lock is uncontended, but it keeps the type
/// `Sync` so it can be shared as a `dyn MessageTransport`.
pub struct MessageProtocol<C: Channel, E: Encoder, D: Decoder> {
    writer: Mutex<CodedWriter<AsyncWriter, E>>,
    reader: Mutex<CodedReader<C::Reader, D>>,
}

impl<C, E, D> MessageProtocol<C, E, D>
where
    C: Channel + 'static,
    E: Encoder,
    D: Decoder,
{
    pub fn new(channel: C, encoder: E, decoder: D) -> Self
    where
        C::Writer: 'static,
    {
        let (reader, writer) = channel.into_split();
        let async_writer = AsyncWriter::new(writer);
        MessageProtocol {
            writer: Mutex::new(CodedWriter::new(async_writer, encoder)),
            reader: Mutex::new(CodedReader::new(reader, decoder)),
        }
    }

    pub async fn send(&self, message: &Message) -> IoResult<()> {
        let mut buffer = beam_buffer::SharedBuffer::new();
        {
            let mut sender = beam_serialize::BufferSender::new(&mut buffer);
            message.send(&mut sender);
        }
        let mut writer = self.writer.lock().await;
        writer.write_message(beam_buffer::Buffer::data(&buffer)).await
    }

    pub async fn receive(&self) -> IoResult<Message> {
        let payload = {
            let mut reader = self.reader.lock().await;
            reader.read_message().await?
        };
        let mut receiver = beam_serialize::BufferReceiver::new(beam_buffer::Buffer::data(&payload));
        Message::receive(&mut receiver).map_err(|e| {
            beam_buffer::IoError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        })
    }

    /// Duplicates a `Shuttle` value by round-tripping it through this
    /// protocol's own wire contract, the role `MessageProtocol::Clone`
    /// plays for `ServiceRequestException` during nested-cause chaining.
    pub fn clone_value<T: Shuttle>(&self, value: &T) -> ReceiveResult<T> {
        shuttle_clone(value, 0)
    }
}

#[async_trait]
impl<C, E, D> MessageTransport for MessageProtocol<C, E, D>
where
    C: Channel + 'static,
    E: Encoder + Send + 'static,
    D: Decoder + Send + 'static,
{
    async fn send(&self, message: &Message) -> IoResult<()> {
        MessageProtocol::send(self, message).await
    }

    async fn receive(&self) -> IoResult<Message> {
        MessageProtocol::receive(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_channel::duplex_pair;
    use beam_codec::{NullDecoder, NullEncoder};

    #[tokio::test]
    async fn sends_and_receives_a_request() {
        let (client_channel, server_channel) = duplex_pair(4096);
        let client = MessageProtocol::new(client_channel, NullEncoder, NullDecoder);
        let server = MessageProtocol::new(server_channel, NullEncoder, NullDecoder);

        let request = Message::Request { request_id: 1, type_tag: 9, body: vec![1, 2, 3] };
        client.send(&request).await.unwrap();
        let received = server.receive().await.unwrap();
        assert_eq!(received, request);
    }

    #[tokio::test]
    async fn heartbeats_round_trip() {
        let (client_channel, server_channel) = duplex_pair(4096);
        let client = MessageProtocol::new(client_channel, NullEncoder, NullDecoder);
        let server = MessageProtocol::new(server_channel, NullEncoder, NullDecoder);

        client.send(&Message::Heartbeat).await.unwrap();
        assert_eq!(server.receive().await.unwrap(), Message::Heartbeat);
    }
}
