use crate::buffer::{Buffer, SharedBuffer};
use crate::error::{IoError, IoResult};
use crate::reader::{Reader, Writer};
use async_trait::async_trait;

/// A `Reader` over an in-memory `SharedBuffer`, consumed from the front as
/// bytes are read (`IO/BufferReader.hpp`). Cheap to construct since
/// `SharedBuffer` clones are O(1).
pub struct BufferReader {
    buffer: SharedBuffer,
    position: usize,
}

impl BufferReader {
    pub fn new(buffer: SharedBuffer) -> Self {
        BufferReader { buffer, position: 0 }
    }
}

#[async_trait]
impl Reader for BufferReader {
    fn is_data_available(&self) -> bool {
        self.position < self.buffer.len()
    }

    async fn read(&mut self, destination: &mut dyn Buffer, max_size: usize) -> IoResult<usize> {
        let remaining = self.buffer.len() - self.position;
        if remaining == 0 {
            return Err(IoError::EndOfFile);
        }
        let take = remaining.min(max_size);
        destination.append(&self.buffer.data()[self.position..self.position + take]);
        self.position += take;
        Ok(take)
    }
}

/// A `Writer` that appends into an in-memory `SharedBuffer`
/// (`IO/BufferWriter.hpp`).
pub struct BufferWriter {
    buffer: SharedBuffer,
}

impl BufferWriter {
    pub fn new(buffer: SharedBuffer) -> Self {
        BufferWriter { buffer }
    }

    pub fn into_buffer(self) -> SharedBuffer {
        self.buffer
    }
}

#[async_trait]
impl Writer for BufferWriter {
    async fn write(&mut self, data: &[u8]) -> IoResult<()> {
        self.buffer.append(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_back_what_was_written() {
        let mut writer = BufferWriter::new(SharedBuffer::new());
        writer.write(b"hello world").await.unwrap();
        let buffer = writer.into_buffer();

        let mut reader = BufferReader::new(buffer);
        let mut out = SharedBuffer::new();
        reader.read(&mut out, 5).await.unwrap();
        reader.read(&mut out, 100).await.unwrap();
        assert_eq!(out.data(), b"hello world");
        let err = reader.read(&mut out, 1).await.unwrap_err();
        assert!(matches!(err, IoError::EndOfFile));
    }
}
