use crate::buffer::{Buffer, SharedBuffer};
use crate::error::IoResult;
use crate::reader::{Reader, Writer};
use byteorder::{ByteOrder, LittleEndian};

/// Reads one length-prefixed frame at a time off an underlying `Reader`:
/// a 4-byte little-endian length followed by exactly that many payload
/// bytes. This is the framing `MessageProtocol::Receive` performs before
/// handing the payload to a `Decoder`; kept here so `beam_protocol` does
/// not need to re-derive the read-loop.
pub struct FramedReader<R> {
    inner: R,
}

impl<R: Reader> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        FramedReader { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads one full frame's payload into a fresh buffer.
    pub async fn read_frame(&mut self) -> IoResult<SharedBuffer> {
        let mut header = SharedBuffer::new();
        self.inner.read_exact(&mut header, 4).await?;
        let size = LittleEndian::read_u32(header.data()) as usize;
        let mut payload = SharedBuffer::new();
        self.inner.read_exact(&mut payload, size).await?;
        Ok(payload)
    }
}

/// Writes one length-prefixed frame at a time to an underlying `Writer`.
pub struct FramedWriter<W> {
    inner: W,
}

impl<W: Writer> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        FramedWriter { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub async fn write_frame(&mut self, payload: &[u8]) -> IoResult<()> {
        let mut header = [0u8; 4];
        LittleEndian::write_u32(&mut header, payload.len() as u32);
        self.inner.write(&header).await?;
        self.inner.write(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_reader::{BufferReader, BufferWriter};

    #[tokio::test]
    async fn round_trips_one_frame() {
        let mut writer = FramedWriter::new(BufferWriter::new(SharedBuffer::new()));
        writer.write_frame(b"payload").await.unwrap();
        let buffer = writer.into_inner().into_buffer();

        let mut reader = FramedReader::new(BufferReader::new(buffer));
        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.data(), b"payload");
    }

    #[tokio::test]
    async fn round_trips_multiple_frames_in_order() {
        let mut writer = FramedWriter::new(BufferWriter::new(SharedBuffer::new()));
        writer.write_frame(b"one").await.unwrap();
        writer.write_frame(b"two").await.unwrap();
        let buffer = writer.into_inner().into_buffer();

        let mut reader = FramedReader::new(BufferReader::new(buffer));
        assert_eq!(reader.read_frame().await.unwrap().data(), b"one");
        assert_eq!(reader.read_frame().await.unwrap().data(), b"two");
    }
}
