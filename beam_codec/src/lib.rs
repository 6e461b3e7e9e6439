//! Encoder/Decoder pairs and the coded-reader/coded-writer stream
//! wrappers built on top of `beam_buffer`'s framing.

pub mod coded;
pub mod codec;
pub mod error;
pub mod null;
pub mod reverse;
pub mod size_declarative;
pub mod zlib;

pub use coded::{CodedReader, CodedWriter};
pub use codec::{Decoder, Encoder};
pub use error::{DecoderError, DecoderResult, EncoderError, EncoderResult};
pub use null::{NullDecoder, NullEncoder};
pub use reverse::{ReverseDecoder, ReverseEncoder};
pub use size_declarative::{SizeDeclarativeDecoder, SizeDeclarativeEncoder};
pub use zlib::{ZLibDecoder, ZLibEncoder};
