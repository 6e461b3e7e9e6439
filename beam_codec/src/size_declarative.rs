use crate::codec::{Decoder, Encoder};
use crate::error::{DecoderError, DecoderResult, EncoderResult};
use beam_buffer::buffer::SuffixBuffer;
use beam_buffer::Buffer;
use byteorder::{BigEndian, ByteOrder};

const PREFIX_SIZE: usize = 4;

/// Prefixes `inner`'s output with its size as a big-endian `u32`
/// (`Codecs/SizeDeclarativeEncoder.hpp`). The prefix is written after
/// `inner` has encoded into a `SuffixBuffer` window past the reserved
/// four bytes, so no extra allocation or copy is needed.
pub struct SizeDeclarativeEncoder<E> {
    inner: E,
}

impl<E> SizeDeclarativeEncoder<E> {
    pub fn new(inner: E) -> Self {
        SizeDeclarativeEncoder { inner }
    }
}

impl<E: Encoder> Encoder for SizeDeclarativeEncoder<E> {
    type Inverse = SizeDeclarativeDecoder<E::Inverse>;
    const IN_PLACE_SUPPORTED: bool = E::IN_PLACE_SUPPORTED;

    fn encode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> EncoderResult<usize> {
        let start = destination.len();
        destination.grow(PREFIX_SIZE);
        let written = {
            let mut suffix = SuffixBuffer::new(destination, start + PREFIX_SIZE);
            self.inner.encode(source, &mut suffix)?
        };
        let mut prefix = [0u8; PREFIX_SIZE];
        BigEndian::write_u32(&mut prefix, written as u32);
        destination
            .write_at(start, &prefix)
            .expect("prefix region was just reserved");
        Ok(PREFIX_SIZE + written)
    }
}

/// Reverses a `SizeDeclarativeEncoder`: reads the big-endian `u32` prefix
/// from the front of `source` and decodes exactly that many of the
/// remaining bytes with `inner` (`Codecs/SizeDeclarativeDecoder.hpp`).
pub struct SizeDeclarativeDecoder<D> {
    inner: D,
}

impl<D> SizeDeclarativeDecoder<D> {
    pub fn new(inner: D) -> Self {
        SizeDeclarativeDecoder { inner }
    }
}

impl<D: Decoder> Decoder for SizeDeclarativeDecoder<D> {
    type Inverse = SizeDeclarativeEncoder<D::Inverse>;
    const IN_PLACE_SUPPORTED: bool = D::IN_PLACE_SUPPORTED;

    fn decode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> DecoderResult<usize> {
        if source.len() < PREFIX_SIZE {
            return Err(DecoderError::new("payload shorter than size prefix"));
        }
        let declared = BigEndian::read_u32(&source[..PREFIX_SIZE]) as usize;
        let body = &source[PREFIX_SIZE..];
        if body.len() < declared {
            return Err(DecoderError::new("payload shorter than declared size"));
        }
        self.inner.decode(&body[..declared], destination)?;
        Ok(PREFIX_SIZE + declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null::{NullDecoder, NullEncoder};
    use beam_buffer::SharedBuffer;

    #[test]
    fn round_trips_with_null_inner() {
        let mut encoder = SizeDeclarativeEncoder::new(NullEncoder);
        let mut decoder = SizeDeclarativeDecoder::new(NullDecoder);
        let mut encoded = SharedBuffer::new();
        encoder.encode(b"payload", &mut encoded).unwrap();
        assert_eq!(&encoded.data()[..4], &[0, 0, 0, 7]);

        let mut decoded = SharedBuffer::new();
        decoder.decode(encoded.data(), &mut decoded).unwrap();
        assert_eq!(decoded.data(), b"payload");
    }

    #[test]
    fn rejects_truncated_prefix() {
        let mut decoder = SizeDeclarativeDecoder::new(NullDecoder);
        let mut decoded = SharedBuffer::new();
        assert!(decoder.decode(&[0, 0], &mut decoded).is_err());
    }

    #[test]
    fn rejects_declared_size_larger_than_body() {
        let mut decoder = SizeDeclarativeDecoder::new(NullDecoder);
        let mut decoded = SharedBuffer::new();
        let mut source = vec![0, 0, 0, 100];
        source.extend_from_slice(b"short");
        assert!(decoder.decode(&source, &mut decoded).is_err());
    }
}
