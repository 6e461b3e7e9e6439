use std::fmt;

/// A stable, loggable name for one end of a [`crate::Channel`]
/// (`Network/NetworkChannelIdentifier.hpp`, `IO/NamedChannelIdentifier.hpp`).
/// Two channels that represent the same peer compare equal even if they
/// were constructed independently (e.g. after a reconnect).
pub trait Identifier: Clone + fmt::Display + Send + Sync + PartialEq {}

impl<T: Clone + fmt::Display + Send + Sync + PartialEq> Identifier for T {}

/// Identifies a peer by socket address, the identifier `beam_channel`'s
/// TCP implementation uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkIdentifier {
    address: String,
}

impl NetworkIdentifier {
    pub fn new(address: impl Into<String>) -> Self {
        NetworkIdentifier { address: address.into() }
    }
}

impl fmt::Display for NetworkIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
