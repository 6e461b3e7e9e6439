use crate::buffer::Buffer;
use crate::error::{IoError, IoResult};
use async_trait::async_trait;

/// Source of bytes. Mirrors `IO::Reader`: `is_data_available` is a
/// non-blocking poll, `read`/`read_into_buffer` append to a caller-owned
/// `Buffer`, and `read_exact` loops until exactly `size` bytes have been
/// appended or the source reports end-of-file.
#[async_trait]
pub trait Reader: Send {
    /// True if a call to `read` is expected to return immediately with at
    /// least one byte.
    fn is_data_available(&self) -> bool;

    /// Reads at least one and at most `max_size` bytes into `destination`,
    /// appending to whatever is already there. Returns the number of bytes
    /// appended. Returns `Err(IoError::EndOfFile)` if the source is
    /// exhausted before any bytes are read.
    async fn read(&mut self, destination: &mut dyn Buffer, max_size: usize) -> IoResult<usize>;

    /// Reads until `destination` has grown by exactly `size` bytes, looping
    /// internally over partial reads.
    async fn read_exact(&mut self, destination: &mut dyn Buffer, size: usize) -> IoResult<()> {
        let mut remaining = size;
        while remaining > 0 {
            let read = self.read(destination, remaining).await?;
            if read == 0 {
                return Err(IoError::EndOfFile);
            }
            remaining -= read;
        }
        Ok(())
    }
}

/// Sink for bytes. Mirrors `IO::Writer`: `write` consumes the entirety of
/// `data` or fails.
#[async_trait]
pub trait Writer: Send {
    async fn write(&mut self, data: &[u8]) -> IoResult<()>;
}

/// A `Reader` that is always empty; every call returns end-of-file
/// immediately. Stands in for a channel's plaintext side when no
/// decryption layer is installed (`IO/NullReader.hpp`).
pub struct NullReader;

#[async_trait]
impl Reader for NullReader {
    fn is_data_available(&self) -> bool {
        false
    }

    async fn read(&mut self, _destination: &mut dyn Buffer, _max_size: usize) -> IoResult<usize> {
        Err(IoError::EndOfFile)
    }
}

/// A `Writer` that silently discards everything written to it
/// (`IO/NullWriter.hpp`).
pub struct NullWriter;

#[async_trait]
impl Writer for NullWriter {
    async fn write(&mut self, _data: &[u8]) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SharedBuffer;

    #[tokio::test]
    async fn null_reader_reports_eof() {
        let mut reader = NullReader;
        let mut buf = SharedBuffer::new();
        let err = reader.read(&mut buf, 10).await.unwrap_err();
        assert!(matches!(err, IoError::EndOfFile));
    }

    #[tokio::test]
    async fn null_writer_discards() {
        let mut writer = NullWriter;
        writer.write(b"anything").await.unwrap();
    }
}
