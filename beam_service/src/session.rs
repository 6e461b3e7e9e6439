use hashbrown::HashMap;

/// Per-endpoint server-side state after a successful authentication
/// handshake (`Services/AuthenticationServletAdapter.hpp`'s session
/// record). `account = None` (the source's `id = -1`) means the
/// endpoint has not logged in yet. `extensions` is the servlet-defined
/// extension slot spec.md §3 mentions — a small string map is enough
/// for the reference services, which only stash the session id there.
#[derive(Debug, Default, Clone)]
pub struct Session {
    account: Option<i64>,
    session_id: Option<String>,
    extensions: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.account.is_some()
    }

    pub fn account(&self) -> Option<i64> {
        self.account
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn log_in(&mut self, account: i64, session_id: impl Into<String>) {
        self.account = Some(account);
        self.session_id = Some(session_id.into());
    }

    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    pub fn set_extension(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extensions.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_logged_out() {
        let session = Session::new();
        assert!(!session.is_logged_in());
        assert_eq!(session.account(), None);
    }

    #[test]
    fn log_in_records_account_and_session_id() {
        let mut session = Session::new();
        session.log_in(42, "abc123");
        assert!(session.is_logged_in());
        assert_eq!(session.account(), Some(42));
        assert_eq!(session.session_id(), Some("abc123"));
    }
}
