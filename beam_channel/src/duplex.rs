use crate::channel::{Channel, TokioReader, TokioWriter};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

/// A `Channel` backed by an in-process `tokio::io::duplex` pipe. Used in
/// tests that need two connected channels without opening a real socket,
/// the role `IO::PipedChannel` / `ServiceLocatorTestEnvironment`'s local
/// channel plays in the original.
pub struct DuplexChannel {
    id: String,
    reader: TokioReader<ReadHalf<DuplexStream>>,
    writer: TokioWriter<WriteHalf<DuplexStream>>,
}

impl Channel for DuplexChannel {
    type Id = String;
    type Reader = TokioReader<ReadHalf<DuplexStream>>;
    type Writer = TokioWriter<WriteHalf<DuplexStream>>;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn reader(&mut self) -> &mut Self::Reader {
        &mut self.reader
    }

    fn writer(&mut self) -> &mut Self::Writer {
        &mut self.writer
    }

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        (self.reader, self.writer)
    }
}

/// Creates a connected pair of `DuplexChannel`s, named `"client"`/`"server"`.
pub fn duplex_pair(buffer_size: usize) -> (DuplexChannel, DuplexChannel) {
    let (a, b) = tokio::io::duplex(buffer_size);
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);
    (
        DuplexChannel {
            id: "client".to_string(),
            reader: TokioReader::new(a_read),
            writer: TokioWriter::new(a_write),
        },
        DuplexChannel {
            id: "server".to_string(),
            reader: TokioReader::new(b_read),
            writer: TokioWriter::new(b_write),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_buffer::{Buffer, Reader, SharedBuffer, Writer};

    #[tokio::test]
    async fn client_and_server_exchange_bytes() {
        let (mut client, mut server) = duplex_pair(1024);
        client.writer().write(b"ping").await.unwrap();
        let mut received = SharedBuffer::new();
        server.reader().read_exact(&mut received, 4).await.unwrap();
        assert_eq!(received.data(), b"ping");
    }
}
