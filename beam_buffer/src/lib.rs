//! Buffer, Reader and Writer primitives: the lowest layer of the stack,
//! providing copy-on-write and fixed-capacity byte containers plus the
//! async `Reader`/`Writer` traits everything above (codecs, channels,
//! the message protocol) is built on.

pub mod async_writer;
pub mod buffer;
pub mod buffer_reader;
pub mod encoding;
pub mod error;
pub mod framed;
pub mod piped;
pub mod queued;
pub mod reader;

pub use async_writer::AsyncWriter;
pub use buffer::{Buffer, BufferBox, SharedBuffer, Span, StaticBuffer, SuffixBuffer};
pub use buffer_reader::{BufferReader, BufferWriter};
pub use error::{BufferError, IoError, IoResult};
pub use framed::{FramedReader, FramedWriter};
pub use piped::{piped_channel, PipedReader, PipedWriter};
pub use queued::QueuedReader;
pub use reader::{NullReader, NullWriter, Reader, Writer};
