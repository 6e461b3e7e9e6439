use crate::codec::{Decoder, Encoder};
use crate::error::{DecoderResult, EncoderResult};
use beam_buffer::Buffer;

/// Passes bytes through unchanged (`Codecs/NullEncoder.hpp`/
/// `NullDecoder.hpp`). Used as the default codec and in tests where
/// framing behavior matters but compression/size-declaration does not.
#[derive(Default, Clone, Copy)]
pub struct NullEncoder;

impl Encoder for NullEncoder {
    type Inverse = NullDecoder;
    const IN_PLACE_SUPPORTED: bool = true;

    fn encode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> EncoderResult<usize> {
        destination.append(source);
        Ok(source.len())
    }
}

#[derive(Default, Clone, Copy)]
pub struct NullDecoder;

impl Decoder for NullDecoder {
    type Inverse = NullEncoder;
    const IN_PLACE_SUPPORTED: bool = true;

    fn decode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> DecoderResult<usize> {
        destination.append(source);
        Ok(source.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_buffer::SharedBuffer;

    #[test]
    fn round_trips_unchanged() {
        let mut encoder = NullEncoder;
        let mut decoder = NullDecoder;
        let mut encoded = SharedBuffer::new();
        encoder.encode(b"payload", &mut encoded).unwrap();
        let mut decoded = SharedBuffer::new();
        decoder.decode(encoded.data(), &mut decoded).unwrap();
        assert_eq!(decoded.data(), b"payload");
    }
}
