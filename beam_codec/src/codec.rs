use crate::error::{DecoderResult, EncoderResult};
use beam_buffer::Buffer;

/// Transforms a plaintext payload into its wire representation
/// (`Codecs/Encoder.hpp`). `IN_PLACE_SUPPORTED` is true when `destination`
/// is permitted to alias `source` entirely (never partially); callers
/// that cannot guarantee a full alias must pass a distinct destination.
pub trait Encoder {
    /// The decoder that reverses this encoder's output.
    type Inverse: Decoder;

    const IN_PLACE_SUPPORTED: bool;

    /// Encodes `source` into `destination`, returning the number of bytes
    /// written. `destination` is appended to, not replaced.
    fn encode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> EncoderResult<usize>;
}

/// Reverses an `Encoder`'s transformation (`Codecs/Decoder.hpp`).
pub trait Decoder {
    type Inverse: Encoder;

    const IN_PLACE_SUPPORTED: bool;

    fn decode(&mut self, source: &[u8], destination: &mut dyn Buffer) -> DecoderResult<usize>;
}
