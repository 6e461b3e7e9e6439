//! Session handshake layered on top of `beam_service`: a servlet
//! adapter that gates an inner servlet's requests behind a logged-in
//! session, and a client-side `Authenticator` that performs the
//! handshake.

pub mod adapter;
pub mod authenticator;
pub mod authority;
pub mod builder;
pub mod error;

pub use adapter::{AuthenticationServletAdapter, SendSessionIdArgs, SendSessionIdService};
pub use authenticator::{Authenticate, Authenticator, NullAuthenticator};
pub use authority::{NullSessionAuthority, SessionAuthority};
pub use builder::AuthenticatedServiceProtocolClientBuilder;
pub use error::ConnectException;
