//! Channel abstractions: a stable peer `Identifier` plus split
//! reader/writer halves, with a TCP implementation and an in-memory
//! duplex implementation for tests.

pub mod channel;
pub mod duplex;
pub mod identifier;
pub mod tcp;

pub use channel::{Channel, TokioReader, TokioWriter};
pub use duplex::{duplex_pair, DuplexChannel};
pub use identifier::{Identifier, NetworkIdentifier};
pub use tcp::{TcpChannel, TcpChannelBuilder, TcpServer};
