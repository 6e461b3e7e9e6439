use std::fmt;
use std::io;

/// Errors raised by the `Buffer` family when a write falls outside the
/// buffer's current bounds or capacity.
#[derive(Debug, Eq, PartialEq)]
pub enum BufferError {
    /// `write_at` was called with an index past the buffer's size.
    OutOfRange,
    /// A `Static`/`Span` buffer was asked to hold more bytes than it has
    /// room for.
    CapacityExceeded,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::OutOfRange => write!(f, "write index out of range"),
            BufferError::CapacityExceeded => write!(f, "buffer capacity exceeded"),
        }
    }
}

impl std::error::Error for BufferError {}

/// Errors surfaced by a `Reader`. Mirrors the source's distinction between a
/// clean peer close (`EndOfFile`) and an unrecoverable transport failure
/// (`IOException`).
#[derive(Debug)]
pub enum IoError {
    /// The peer closed the connection, or an internal queue was closed.
    EndOfFile,
    /// An unrecoverable I/O error occurred.
    Io(io::Error),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::EndOfFile => write!(f, "end of file"),
            IoError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for IoError {}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => IoError::EndOfFile,
            _ => IoError::Io(e),
        }
    }
}

pub type IoResult<T> = Result<T, IoError>;
