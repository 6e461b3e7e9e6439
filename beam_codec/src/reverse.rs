use crate::codec::{Decoder, Encoder};
use crate::error::{DecoderResult, EncoderResult};
use beam_buffer::Buffer;

/// Reverses the byte order of the payload. Self-inverse and used only to
/// exercise codec-composition and framing code paths in tests
/// (`Codecs/Tests/ReverseEncoder.hpp` analogue).
#[derive(Default, Clone, Copy)]
pub struct ReverseEncoder;

impl Encoder for ReverseEncoder {
    type Inverse = ReverseDecoder;
    const IN_PLACE_SUPPORTED: bool = false;

    fn encode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> EncoderResult<usize> {
        let reversed: Vec<u8> = source.iter().rev().copied().collect();
        destination.append(&reversed);
        Ok(reversed.len())
    }
}

#[derive(Default, Clone, Copy)]
pub struct ReverseDecoder;

impl Decoder for ReverseDecoder {
    type Inverse = ReverseEncoder;
    const IN_PLACE_SUPPORTED: bool = false;

    fn decode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> DecoderResult<usize> {
        let reversed: Vec<u8> = source.iter().rev().copied().collect();
        destination.append(&reversed);
        Ok(reversed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_buffer::SharedBuffer;

    #[test]
    fn reverse_is_self_inverse() {
        let mut encoder = ReverseEncoder;
        let mut decoder = ReverseDecoder;
        let mut encoded = SharedBuffer::new();
        encoder.encode(b"abcdef", &mut encoded).unwrap();
        assert_eq!(encoded.data(), b"fedcba");
        let mut decoded = SharedBuffer::new();
        decoder.decode(encoded.data(), &mut decoded).unwrap();
        assert_eq!(decoded.data(), b"abcdef");
    }
}
