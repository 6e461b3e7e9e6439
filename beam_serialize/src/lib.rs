//! Binary serialization: the `Sender`/`Receiver` wire primitives, the
//! `Shuttle` trait built on top of them, and the `TypeRegistry` that maps
//! message UIDs to the numeric tags written on the wire.

pub mod error;
pub mod receiver;
pub mod sender;
pub mod shuttle;
pub mod type_registry;

pub use error::{ReceiveError, ReceiveResult};
pub use receiver::{BufferReceiver, Receiver};
pub use sender::{BufferSender, Sender};
pub use shuttle::{shuttle_clone, Shuttle};
pub use type_registry::TypeRegistry;
