use crate::adapter::{SendSessionIdArgs, SendSessionIdService};
use crate::error::ConnectException;
use async_trait::async_trait;
use beam_service::ServiceProtocolClient;
use rand::distributions::Uniform;
use rand::prelude::*;
use sha1::{Digest, Sha1};

const ALLOWED_CHARS: [char; 35] = [
    '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l',
    'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const KEY_LEN: usize = 24;

/// Client side of the §4.9 handshake: generate a random key, compute
/// `UPPER(SHA1(key || session_id))`, and send both to a servlet wrapped
/// in an `AuthenticationServletAdapter`.
pub struct Authenticator;

impl Authenticator {
    /// `session_id` is whatever the caller's prior login against the
    /// service-locator returned; this call only proves the caller
    /// holds it, it does not perform the login itself.
    pub async fn authenticate(
        client: &ServiceProtocolClient,
        session_id: &str,
    ) -> Result<(), ConnectException> {
        let key = generate_key();
        let sha = digest(&key, session_id);
        let args = SendSessionIdArgs { key, sha };
        match client.send_request::<SendSessionIdService>(args).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ConnectException::new("session handshake rejected")),
            Err(e) => Err(ConnectException::from(e)),
        }
    }
}

/// A pluggable §4.9 handshake strategy — the seam
/// `AuthenticatedServiceProtocolClientBuilder` builds against, so a
/// caller can swap in [`NullAuthenticator`] for a servlet gated by
/// `authority::NullSessionAuthority` without touching the builder.
#[async_trait]
pub trait Authenticate: Send + Sync + 'static {
    async fn authenticate(&self, client: &ServiceProtocolClient, session_id: &str) -> Result<(), ConnectException>;
}

#[async_trait]
impl Authenticate for Authenticator {
    async fn authenticate(&self, client: &ServiceProtocolClient, session_id: &str) -> Result<(), ConnectException> {
        Authenticator::authenticate(client, session_id).await
    }
}

/// Skips the §4.9 handshake entirely (`ServiceLocator/NullAuthenticator.hpp`):
/// for wiring a client against a servlet whose `AuthenticationServletAdapter`
/// uses `authority::NullSessionAuthority`, where no real session proof is
/// required. For tests only.
pub struct NullAuthenticator;

#[async_trait]
impl Authenticate for NullAuthenticator {
    async fn authenticate(&self, _client: &ServiceProtocolClient, _session_id: &str) -> Result<(), ConnectException> {
        Ok(())
    }
}

fn digest(key: &str, session_id: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(session_id.as_bytes());
    hasher.finalize().iter().map(|byte| format!("{:02X}", byte)).collect()
}

fn generate_key() -> String {
    let mut rng = thread_rng();
    rng.sample_iter(&Uniform::new(0, ALLOWED_CHARS.len()))
        .take(KEY_LEN)
        .map(|sample| ALLOWED_CHARS[sample])
        .collect()
}
