use crate::authority::SessionAuthority;
use beam_serialize::{ReceiveResult, Receiver, Sender, Shuttle};
use beam_service::{ClientHandle, Service, ServiceRequestException, ServiceSlots, Servlet, Session};
use std::sync::Arc;

/// Arguments to `SendSessionIdService`: a random client-chosen `key` and
/// `sha = UPPER(SHA1(key || session_id))` (§4.9, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSessionIdArgs {
    pub key: String,
    pub sha: String,
}

impl Shuttle for SendSessionIdArgs {
    fn send<S: Sender>(&self, sender: &mut S, _version: u32) {
        sender.send_string(&self.key);
        sender.send_string(&self.sha);
    }

    fn receive<R: Receiver>(receiver: &mut R, _version: u32) -> ReceiveResult<Self> {
        let key = receiver.receive_string()?;
        let sha = receiver.receive_string()?;
        Ok(SendSessionIdArgs { key, sha })
    }
}

pub struct SendSessionIdService;

impl Service for SendSessionIdService {
    const UID: &'static str = "Beam.Auth.SendSessionIdService";
    type Args = SendSessionIdArgs;
    type Return = bool;
}

/// Wraps an inner `Servlet` with a handshake gate (§4.9): every request
/// slot the inner servlet registers is pre-hooked to require a logged
/// in session, and a `SendSessionIdService` slot is added that, given a
/// `(key, sha)` pair the `authority` accepts, logs the endpoint's
/// session in. `handle_accept`/`handle_close` on the inner servlet only
/// fire once the handshake has succeeded.
pub struct AuthenticationServletAdapter<I, A> {
    inner: Arc<I>,
    authority: Arc<A>,
}

impl<I, A> AuthenticationServletAdapter<I, A> {
    pub fn new(inner: I, authority: A) -> Self {
        AuthenticationServletAdapter { inner: Arc::new(inner), authority: Arc::new(authority) }
    }
}

impl<I: Servlet, A: SessionAuthority> Servlet for AuthenticationServletAdapter<I, A> {
    const SUPPORTS_PARALLELISM: bool = I::SUPPORTS_PARALLELISM;

    fn register_services(&self, slots: &mut ServiceSlots) {
        let mut inner_slots = ServiceSlots::new();
        self.inner.register_services(&mut inner_slots);
        inner_slots.add_pre_hook_to_all_request_slots(Arc::new(|session: &Session| {
            if session.is_logged_in() {
                Ok(())
            } else {
                Err(ServiceRequestException::new("Not logged in."))
            }
        }));
        slots.add(inner_slots);

        let authority = self.authority.clone();
        let inner = self.inner.clone();
        slots.add_request_slot::<SendSessionIdService, _>(move |client, token, args| {
            match authority.authenticate_session(&args.key, &args.sha) {
                Some(account) => {
                    let first_login = client.with_session(|session| {
                        let already_logged_in = session.is_logged_in();
                        // The canonical session id lives on the service
                        // locator; this endpoint only ever learns that
                        // the handshake matched some open session.
                        session.log_in(account, String::new());
                        !already_logged_in
                    });
                    if first_login {
                        inner.handle_accept(client.clone());
                    }
                    token.set_result(true);
                }
                None => token.set_exception(ServiceRequestException::new("Session not found.")),
            }
        });
    }

    fn handle_accept(&self, _client: ClientHandle) {
        // Deferred to the inner servlet until the handshake succeeds.
    }

    fn handle_close(&self, client: ClientHandle) {
        if client.session().is_logged_in() {
            self.inner.handle_close(client);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::NullSessionAuthority;
    use beam_channel::duplex_pair;
    use beam_codec::{NullDecoder, NullEncoder};
    use beam_protocol::{MessageProtocol, MessageTransport};
    use beam_service::ServiceProtocolClient;
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Empty;

    impl Shuttle for Empty {
        fn send<S: Sender>(&self, _sender: &mut S, _version: u32) {}
        fn receive<R: Receiver>(_receiver: &mut R, _version: u32) -> ReceiveResult<Self> {
            Ok(Empty)
        }
    }

    struct Probe;
    impl Service for Probe {
        const UID: &'static str = "Test.Auth.Probe";
        type Args = Empty;
        type Return = bool;
    }

    struct ProbeServlet;
    impl Servlet for ProbeServlet {
        fn register_services(&self, slots: &mut ServiceSlots) {
            slots.add_slot::<Probe, _>(|_client, _args: Empty| Ok(true));
        }
    }

    fn test_logger() -> slog::Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn request_fails_before_handshake_and_succeeds_after() {
        let (client_channel, server_channel) = duplex_pair(8192);
        let server_transport: Arc<dyn MessageTransport> =
            Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        let client_transport: Arc<dyn MessageTransport> =
            Arc::new(MessageProtocol::new(client_channel, NullEncoder, NullDecoder));

        let adapter = AuthenticationServletAdapter::new(ProbeServlet, NullSessionAuthority);
        let mut server_slots = ServiceSlots::new();
        adapter.register_services(&mut server_slots);
        let server = ServiceProtocolClient::new(
            server_transport,
            Arc::new(server_slots),
            Duration::from_secs(30),
            false,
            test_logger(),
        );

        let mut client_slots = ServiceSlots::new();
        client_slots.register_service::<Probe>();
        client_slots.register_service::<SendSessionIdService>();
        let client = ServiceProtocolClient::new(
            client_transport,
            Arc::new(client_slots),
            Duration::from_secs(30),
            false,
            test_logger(),
        );

        let before = client.send_request::<Probe>(Empty).await;
        assert!(before.is_err());

        let handshake = client
            .send_request::<SendSessionIdService>(SendSessionIdArgs {
                key: "k".to_string(),
                sha: "ignored-by-null-authority".to_string(),
            })
            .await;
        assert_eq!(handshake, Ok(true));

        let after = client.send_request::<Probe>(Empty).await;
        assert_eq!(after, Ok(true));

        client.close().await;
        server.close().await;
    }
}
