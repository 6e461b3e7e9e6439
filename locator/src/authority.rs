use crate::state::DataStore;
use beam_auth::SessionAuthority;
use std::sync::Arc;

/// The locator's own session table used as a `SessionAuthority` (§4.9):
/// any servlet gated by `beam_auth::AuthenticationServletAdapter` can
/// hand this to it instead of rolling its own session lookup.
pub struct LocatorSessionAuthority {
    store: Arc<DataStore>,
}

impl LocatorSessionAuthority {
    pub fn new(store: Arc<DataStore>) -> Self {
        LocatorSessionAuthority { store }
    }
}

impl SessionAuthority for LocatorSessionAuthority {
    fn authenticate_session(&self, key: &str, sha: &str) -> Option<i64> {
        self.store.with_transaction(|state| state.authenticate_session(key, sha))
    }
}
