use crate::identifier::Identifier;
use beam_buffer::{IoError, IoResult, Reader, Writer};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Two-way point of contact with a peer (`IO/Channel.hpp`): a stable
/// identity plus split reader/writer halves. Channels don't know about
/// framing, encoding, or the service protocol above them — they only
/// move bytes.
pub trait Channel: Send {
    type Id: Identifier;
    type Reader: Reader;
    type Writer: Writer;

    fn id(&self) -> &Self::Id;
    fn reader(&mut self) -> &mut Self::Reader;
    fn writer(&mut self) -> &mut Self::Writer;

    /// Consumes the channel, handing back its reader and writer halves so
    /// each can be driven independently (e.g. the writer moved onto an
    /// `AsyncWriter` background task while the reader stays on the
    /// dispatch loop).
    fn into_split(self) -> (Self::Reader, Self::Writer);
}

/// Adapts any `tokio::io::AsyncRead` half into a `beam_buffer::Reader`.
pub struct TokioReader<T> {
    inner: T,
}

impl<T> TokioReader<T> {
    pub fn new(inner: T) -> Self {
        TokioReader { inner }
    }
}

#[async_trait]
impl<T: AsyncRead + Unpin + Send> Reader for TokioReader<T> {
    fn is_data_available(&self) -> bool {
        false
    }

    async fn read(&mut self, destination: &mut dyn beam_buffer::Buffer, max_size: usize) -> IoResult<usize> {
        let mut scratch = vec![0u8; max_size.max(1)];
        let read = self.inner.read(&mut scratch).await.map_err(IoError::from)?;
        if read == 0 {
            return Err(IoError::EndOfFile);
        }
        destination.append(&scratch[..read]);
        Ok(read)
    }
}

/// Adapts any `tokio::io::AsyncWrite` half into a `beam_buffer::Writer`.
pub struct TokioWriter<T> {
    inner: T,
}

impl<T> TokioWriter<T> {
    pub fn new(inner: T) -> Self {
        TokioWriter { inner }
    }
}

#[async_trait]
impl<T: AsyncWrite + Unpin + Send> Writer for TokioWriter<T> {
    async fn write(&mut self, data: &[u8]) -> IoResult<()> {
        self.inner.write_all(data).await.map_err(IoError::from)
    }
}
