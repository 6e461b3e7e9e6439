//! The reference registry (§4.11): a content tree of directories and
//! byte values riding the same protocol as the service-locator, gated
//! behind a locator login via `beam_auth::AuthenticationServletAdapter`.

pub mod client;
pub mod entry;
pub mod servlet;
pub mod state;
pub mod wire;

pub use client::RegistryClient;
pub use entry::{EntryId, EntryKind, RegistryEntry, NONE_ID, ROOT_ID};
pub use servlet::RegistryServlet;
pub use state::{DataStore, RegistryState};
