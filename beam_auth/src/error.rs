use beam_service::ServiceRequestException;
use std::fmt;

/// Raised by the client-side `Authenticator` when a session handshake
/// fails (§7's authentication-error category, distinct from a plain
/// `ServiceRequestException` so callers can distinguish "could not log
/// in" from a general service failure).
#[derive(Debug, Clone)]
pub struct ConnectException {
    reason: String,
}

impl ConnectException {
    pub fn new(reason: impl Into<String>) -> Self {
        ConnectException { reason: reason.into() }
    }
}

impl fmt::Display for ConnectException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection failed: {}", self.reason)
    }
}

impl std::error::Error for ConnectException {}

impl From<ServiceRequestException> for ConnectException {
    fn from(exception: ServiceRequestException) -> Self {
        ConnectException::new(exception.message().to_string())
    }
}
