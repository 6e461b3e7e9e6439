use std::fmt;

/// Raised when `Encoder::encode` cannot produce a valid frame.
#[derive(Debug)]
pub struct EncoderError {
    message: String,
}

impl EncoderError {
    pub fn new(message: impl Into<String>) -> Self {
        EncoderError { message: message.into() }
    }
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EncoderError {}

/// Raised when `Decoder::decode` encounters malformed or corrupt input.
#[derive(Debug)]
pub struct DecoderError {
    message: String,
}

impl DecoderError {
    pub fn new(message: impl Into<String>) -> Self {
        DecoderError { message: message.into() }
    }
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DecoderError {}

pub type EncoderResult<T> = Result<T, EncoderError>;
pub type DecoderResult<T> = Result<T, DecoderError>;
