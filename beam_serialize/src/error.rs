use std::fmt;

/// Raised reading a value off a `Receiver` when the wire form is
/// malformed or truncated (`Serialization/SerializationException.hpp`).
#[derive(Debug)]
pub enum ReceiveError {
    /// Fewer bytes remained than the value being decoded requires.
    UnexpectedEnd,
    /// A string field was not valid UTF-8.
    InvalidUtf8,
    /// A type tag had no corresponding entry in the `TypeRegistry`.
    UnknownType(u32),
    /// Any other malformed-payload condition, with a human-readable reason.
    Malformed(String),
}

impl fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiveError::UnexpectedEnd => write!(f, "unexpected end of payload"),
            ReceiveError::InvalidUtf8 => write!(f, "invalid utf-8 in string field"),
            ReceiveError::UnknownType(tag) => write!(f, "unknown type tag {}", tag),
            ReceiveError::Malformed(reason) => write!(f, "malformed payload: {}", reason),
        }
    }
}

impl std::error::Error for ReceiveError {}

pub type ReceiveResult<T> = Result<T, ReceiveError>;
