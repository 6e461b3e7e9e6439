use crate::buffer::Buffer;
use crate::error::{IoError, IoResult};
use crate::reader::{Reader, Writer};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Shared state between a `PipedReader`/`PipedWriter` pair
/// (`IO/PipedReader.hpp`/`IO/PipedWriter.hpp`): an in-process byte pipe
/// used to hand a decoded/decrypted stream from one task to another
/// without an intervening socket.
struct Pipe {
    data: Mutex<VecDeque<u8>>,
    closed: Mutex<Option<Option<String>>>,
    notify: Notify,
}

impl Pipe {
    fn new() -> Self {
        Pipe {
            data: Mutex::new(VecDeque::new()),
            closed: Mutex::new(None),
            notify: Notify::new(),
        }
    }
}

/// The read end of a [`Pipe`]. Blocks (asynchronously) until the writer
/// pushes data or closes the pipe.
pub struct PipedReader {
    pipe: Arc<Pipe>,
}

/// The write end of a [`Pipe`].
pub struct PipedWriter {
    pipe: Arc<Pipe>,
}

/// Creates a connected `PipedReader`/`PipedWriter` pair sharing one
/// internal buffer.
pub fn piped_channel() -> (PipedReader, PipedWriter) {
    let pipe = Arc::new(Pipe::new());
    (PipedReader { pipe: pipe.clone() }, PipedWriter { pipe })
}

impl PipedWriter {
    /// Closes the pipe. If `err` is `Some`, pending and future reads fail
    /// with that message wrapped in an `io::Error`; otherwise reads drain
    /// remaining buffered data and then report `EndOfFile`.
    pub async fn close(&self, err: Option<String>) {
        let mut closed = self.pipe.closed.lock().await;
        if closed.is_none() {
            *closed = Some(err);
        }
        self.pipe.notify.notify_waiters();
    }
}

#[async_trait]
impl Writer for PipedWriter {
    async fn write(&mut self, data: &[u8]) -> IoResult<()> {
        {
            let closed = self.pipe.closed.lock().await;
            if closed.is_some() {
                return Err(IoError::EndOfFile);
            }
        }
        {
            let mut buf = self.pipe.data.lock().await;
            buf.extend(data.iter().copied());
        }
        self.pipe.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl Reader for PipedReader {
    fn is_data_available(&self) -> bool {
        self.pipe
            .data
            .try_lock()
            .map(|d| !d.is_empty())
            .unwrap_or(false)
    }

    async fn read(&mut self, destination: &mut dyn Buffer, max_size: usize) -> IoResult<usize> {
        loop {
            {
                let mut buf = self.pipe.data.lock().await;
                if !buf.is_empty() {
                    let take = buf.len().min(max_size).max(1).min(buf.len());
                    let chunk: Vec<u8> = buf.drain(..take).collect();
                    destination.append(&chunk);
                    return Ok(chunk.len());
                }
            }
            {
                let closed = self.pipe.closed.lock().await;
                if let Some(reason) = closed.as_ref() {
                    return match reason {
                        Some(message) => {
                            Err(IoError::Io(std::io::Error::new(std::io::ErrorKind::Other, message.clone())))
                        }
                        None => Err(IoError::EndOfFile),
                    };
                }
            }
            self.pipe.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SharedBuffer;

    #[tokio::test]
    async fn writes_are_visible_to_reader() {
        let (mut reader, mut writer) = piped_channel();
        writer.write(b"hello").await.unwrap();
        let mut buf = SharedBuffer::new();
        let n = reader.read(&mut buf, 5).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf.data(), b"hello");
    }

    #[tokio::test]
    async fn close_without_error_yields_eof_after_drain() {
        let (mut reader, writer) = piped_channel();
        writer.close(None).await;
        let mut buf = SharedBuffer::new();
        let err = reader.read(&mut buf, 10).await.unwrap_err();
        assert!(matches!(err, IoError::EndOfFile));
    }

    #[tokio::test]
    async fn read_waits_for_write() {
        let (mut reader, mut writer) = piped_channel();
        let handle = tokio::spawn(async move {
            let mut buf = SharedBuffer::new();
            reader.read(&mut buf, 3).await.unwrap();
            buf.data().to_vec()
        });
        tokio::task::yield_now().await;
        writer.write(b"abc").await.unwrap();
        let got = handle.await.unwrap();
        assert_eq!(got, b"abc");
    }
}
