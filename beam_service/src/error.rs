use beam_serialize::{ReceiveResult, Receiver, Sender, Shuttle};
use std::fmt;

/// A service-level failure returned in a `Response`'s exception branch
/// (`Services/ServiceRequestException.hpp`). Carries an optional nested
/// cause so a handler that wraps a lower-level failure can preserve the
/// chain across the wire; `Display` walks the chain the way
/// `rethrow_nested_service_exception` does when pretty-printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequestException {
    message: String,
    nested: Option<Box<ServiceRequestException>>,
}

impl ServiceRequestException {
    pub fn new(message: impl Into<String>) -> Self {
        ServiceRequestException { message: message.into(), nested: None }
    }

    pub fn with_nested(message: impl Into<String>, nested: ServiceRequestException) -> Self {
        ServiceRequestException { message: message.into(), nested: Some(Box::new(nested)) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn nested(&self) -> Option<&ServiceRequestException> {
        self.nested.as_deref()
    }

    /// `ServiceLocator/ServiceLocatorClient.hpp`'s permission-denied
    /// exceptions all carry this exact text.
    pub fn insufficient_permissions() -> Self {
        ServiceRequestException::new("Insufficient permissions.")
    }
}

impl fmt::Display for ServiceRequestException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(nested) = &self.nested {
            write!(f, ": {}", nested)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceRequestException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.nested.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl Shuttle for ServiceRequestException {
    fn send<S: Sender>(&self, sender: &mut S, version: u32) {
        sender.send_string(&self.message);
        sender.send_optional(&self.nested, |s, nested| nested.send(s, version));
    }

    fn receive<R: Receiver>(receiver: &mut R, version: u32) -> ReceiveResult<Self> {
        let message = receiver.receive_string()?;
        let nested = receiver.receive_optional(|r| {
            ServiceRequestException::receive(r, version).map(Box::new)
        })?;
        Ok(ServiceRequestException { message, nested })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_buffer::SharedBuffer;
    use beam_serialize::{BufferReceiver, BufferSender};

    #[test]
    fn round_trips_with_nested_cause() {
        let original = ServiceRequestException::with_nested(
            "outer",
            ServiceRequestException::new("inner"),
        );
        let mut buffer = SharedBuffer::new();
        {
            let mut sender = BufferSender::new(&mut buffer);
            original.send(&mut sender, 0);
        }
        let mut receiver = BufferReceiver::new(beam_buffer::Buffer::data(&buffer));
        let decoded = ServiceRequestException::receive(&mut receiver, 0).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.to_string(), "outer: inner");
    }
}
