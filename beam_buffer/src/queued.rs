use crate::buffer::Buffer;
use crate::error::IoResult;
use crate::piped::{piped_channel, PipedReader};
use crate::reader::Reader;

/// Pumps an inner `Reader` on a background task into an internal pipe, so
/// callers of [`QueuedReader::read`] never drive the inner reader
/// directly (`IO/QueuedReader.hpp`). Used when a reader must be shared
/// between a read loop and something that wants to peek availability
/// without racing the loop for raw socket reads.
pub struct QueuedReader {
    pipe: PipedReader,
}

impl QueuedReader {
    pub fn new<R: Reader + 'static>(mut inner: R) -> Self {
        let (pipe_reader, writer) = piped_channel();
        tokio::spawn(async move {
            let mut scratch = crate::buffer::SharedBuffer::new();
            loop {
                scratch.reset();
                match inner.read(&mut scratch, 4096).await {
                    Ok(_) => {
                        if writer.write(scratch.data()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let message = match &e {
                            crate::error::IoError::EndOfFile => None,
                            crate::error::IoError::Io(io_err) => Some(io_err.to_string()),
                        };
                        writer.close(message).await;
                        break;
                    }
                }
            }
        });
        QueuedReader { pipe: pipe_reader }
    }
}

#[async_trait::async_trait]
impl Reader for QueuedReader {
    fn is_data_available(&self) -> bool {
        self.pipe.is_data_available()
    }

    async fn read(&mut self, destination: &mut dyn Buffer, max_size: usize) -> IoResult<usize> {
        self.pipe.read(destination, max_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SharedBuffer;
    use crate::buffer_reader::BufferReader;

    #[tokio::test]
    async fn drains_inner_reader_through_background_task() {
        let inner = BufferReader::new(SharedBuffer::from_bytes(b"queued data"));
        let mut queued = QueuedReader::new(inner);
        let mut out = SharedBuffer::new();
        queued.read_exact(&mut out, 11).await.unwrap();
        assert_eq!(out.data(), b"queued data");
    }
}
