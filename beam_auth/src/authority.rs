/// Validates a `(key, sha)` pair presented by `SendSessionIdService`
/// against whatever holds the authoritative session table — in
/// practice the service-locator's client, reached over
/// `SessionAuthenticationService` (§4.9, §6). The wire never carries a
/// session id directly; the authority is expected to know its own open
/// sessions and find the one whose id makes `UPPER(SHA1(key||id))`
/// equal `sha`. Kept as a capability interface rather than a direct
/// dependency on the locator crate, so `beam_auth` itself never needs
/// to know about directories or accounts.
pub trait SessionAuthority: Send + Sync + 'static {
    /// Returns the account id the matching session belongs to, or
    /// `None` if no open session's digest matches.
    fn authenticate_session(&self, key: &str, sha: &str) -> Option<i64>;
}

/// Accepts every handshake unconditionally, logging every caller in as
/// account `0` (`ServiceLocator/NullAuthenticator.hpp`'s role, adapted:
/// there it skips the handshake entirely; here it still exercises the
/// adapter's wiring but never rejects). For tests only.
pub struct NullSessionAuthority;

impl SessionAuthority for NullSessionAuthority {
    fn authenticate_session(&self, _key: &str, _sha: &str) -> Option<i64> {
        Some(0)
    }
}
