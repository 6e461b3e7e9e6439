//! The reference service-locator (§4.10): a directory/account DAG with
//! per-edge permissions, a service-registration table, and the session
//! handshake dependent services (e.g. `registry`) authenticate against.

pub mod authority;
pub mod client;
pub mod entry;
pub mod permissions;
pub mod servlet;
pub mod state;
pub mod wire;

pub use authority::LocatorSessionAuthority;
pub use client::{connect, LocatorConnectError, ServiceLocatorClient, ServiceLocatorClientConfig};
pub use entry::{DirectoryEntry, EntryId, EntryKind, NONE_ID, STAR_ID};
pub use permissions::{PermissionTable, Permissions, ADMINISTRATE, MOVE, READ};
pub use servlet::ServiceLocatorServlet;
pub use state::{DataStore, LocatorState, ServiceEntry};
