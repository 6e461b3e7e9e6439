use crate::authenticator::{Authenticate, Authenticator};
use crate::error::ConnectException;
use async_trait::async_trait;
use beam_buffer::error::IoResult;
use beam_channel::Channel;
use beam_codec::{Decoder, Encoder};
use beam_protocol::{MessageProtocol, MessageTransport};
use beam_service::{ClientBuilder, ServiceProtocolClient, ServiceSlots};
use slog::Logger;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Connect<C> = Arc<dyn Fn() -> BoxFuture<IoResult<C>> + Send + Sync>;
type SessionIdProvider = Arc<dyn Fn() -> BoxFuture<Result<String, ConnectException>> + Send + Sync>;

/// Composes a channel builder with the §4.9 handshake into a single
/// `beam_service::ClientBuilder`
/// (`Services/AuthenticatedServiceProtocolClientBuilder.hpp`): each
/// `build` call opens a fresh channel, wraps it in a `MessageProtocol`,
/// constructs a `ServiceProtocolClient`, and runs `Authenticator::
/// authenticate` against it before handing the client back — so every
/// client a `ServiceProtocolClientHandler` produces from this builder
/// is already past the handshake.
///
/// `slots` passed to `build` must already have
/// `SendSessionIdService` registered (via its `slots_factory`) — the
/// same requirement `registry::RegistryClient::new` and
/// `locator::client::connect`'s dependents satisfy by calling
/// `slots.register_service::<beam_auth::SendSessionIdService>()`
/// alongside their own wire types.
///
/// Generic over the handshake strategy `A` (defaulting to the real
/// [`Authenticator`]) so a caller can substitute
/// `authenticator::NullAuthenticator` when wiring against a servlet
/// gated by `authority::NullSessionAuthority` in tests.
pub struct AuthenticatedServiceProtocolClientBuilder<C, E, D, A = Authenticator> {
    connect: Connect<C>,
    encoder_factory: Arc<dyn Fn() -> E + Send + Sync>,
    decoder_factory: Arc<dyn Fn() -> D + Send + Sync>,
    session_id: SessionIdProvider,
    heartbeat_interval: Duration,
    logger: Logger,
    authenticator: A,
}

impl<C, E, D, A> AuthenticatedServiceProtocolClientBuilder<C, E, D, A>
where
    C: Channel + 'static,
    E: Encoder + Send + 'static,
    D: Decoder + Send + 'static,
    A: Authenticate,
{
    pub fn new(
        connect: impl Fn() -> BoxFuture<IoResult<C>> + Send + Sync + 'static,
        encoder_factory: impl Fn() -> E + Send + Sync + 'static,
        decoder_factory: impl Fn() -> D + Send + Sync + 'static,
        session_id: impl Fn() -> BoxFuture<Result<String, ConnectException>> + Send + Sync + 'static,
        heartbeat_interval: Duration,
        logger: Logger,
        authenticator: A,
    ) -> Self {
        AuthenticatedServiceProtocolClientBuilder {
            connect: Arc::new(connect),
            encoder_factory: Arc::new(encoder_factory),
            decoder_factory: Arc::new(decoder_factory),
            session_id: Arc::new(session_id),
            heartbeat_interval,
            logger,
            authenticator,
        }
    }
}

#[async_trait]
impl<C, E, D, A> ClientBuilder for AuthenticatedServiceProtocolClientBuilder<C, E, D, A>
where
    C: Channel + 'static,
    E: Encoder + Send + 'static,
    D: Decoder + Send + 'static,
    A: Authenticate,
{
    type Error = ConnectException;

    async fn build(&self, slots: ServiceSlots) -> Result<Arc<ServiceProtocolClient>, ConnectException> {
        let channel = (self.connect)().await.map_err(|e| ConnectException::new(e.to_string()))?;
        let transport: Arc<dyn MessageTransport> =
            Arc::new(MessageProtocol::new(channel, (self.encoder_factory)(), (self.decoder_factory)()));
        let client = ServiceProtocolClient::new(transport, Arc::new(slots), self.heartbeat_interval, false, self.logger.clone());
        let session_id = (self.session_id)().await?;
        self.authenticator.authenticate(&client, &session_id).await?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::NullSessionAuthority;
    use beam_channel::{duplex_pair, DuplexChannel};
    use beam_codec::{NullDecoder, NullEncoder};
    use beam_serialize::{ReceiveResult, Receiver, Sender, Shuttle};
    use beam_service::{Service, ServiceProtocolClientHandler, ServiceSlots, Servlet};
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;
    use tokio::sync::Mutex;

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
        const UID: &'static str = "Test.Auth.Builder.Probe";
        type Args = Empty;
        type Return = bool;
    }

    struct ProbeServlet;
    impl Servlet for ProbeServlet {
        fn register_services(&self, slots: &mut ServiceSlots) {
            slots.add_slot::<Probe, _>(|_client, _args: Empty| Ok(true));
        }
    }

    fn test_logger() -> Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn builder_produces_an_authenticated_client() {
        let channels = Arc::new(Mutex::new(Vec::<DuplexChannel>::new()));
        let (client_channel, server_channel) = duplex_pair(8192);

        let adapter = crate::AuthenticationServletAdapter::new(ProbeServlet, NullSessionAuthority);
        let mut server_slots = ServiceSlots::new();
        adapter.register_services(&mut server_slots);
        let server_transport: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        let server =
            ServiceProtocolClient::new(server_transport, Arc::new(server_slots), Duration::from_secs(30), false, test_logger());

        channels.lock().await.push(client_channel);
        let pulled = channels.clone();

        let builder = AuthenticatedServiceProtocolClientBuilder::new(
            move || {
                let pulled = pulled.clone();
                Box::pin(async move { pulled.lock().await.pop().ok_or(beam_buffer::IoError::EndOfFile) })
            },
            || NullEncoder,
            || NullDecoder,
            || Box::pin(async { Ok("whatever-session".to_string()) }),
            Duration::from_secs(30),
            test_logger(),
            Authenticator,
        );

        let handler = ServiceProtocolClientHandler::new(
            builder,
            Arc::new(|| {
                let mut slots = ServiceSlots::new();
                slots.register_service::<Probe>();
                slots.register_service::<crate::SendSessionIdService>();
                slots
            }),
            Arc::new(|| Duration::from_millis(5)),
            Arc::new(|_client| {}),
            test_logger(),
        );

        let client = handler.client().await;
        let reply = client.send_request::<Probe>(Empty).await;
        assert_eq!(reply, Ok(true));

        handler.close().await;
        server.close().await;
    }

    #[tokio::test]
    async fn null_authenticator_skips_the_handshake_against_an_ungated_servlet() {
        let (client_channel, server_channel) = duplex_pair(8192);

        let mut server_slots = ServiceSlots::new();
        ProbeServlet.register_services(&mut server_slots);
        let server_transport: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        let server =
            ServiceProtocolClient::new(server_transport, Arc::new(server_slots), Duration::from_secs(30), false, test_logger());

        let channels = Arc::new(Mutex::new(vec![client_channel]));
        let builder = AuthenticatedServiceProtocolClientBuilder::new(
            move || {
                let channels = channels.clone();
                Box::pin(async move { channels.lock().await.pop().ok_or(beam_buffer::IoError::EndOfFile) })
            },
            || NullEncoder,
            || NullDecoder,
            || Box::pin(async { Ok(String::new()) }),
            Duration::from_secs(30),
            test_logger(),
            crate::authenticator::NullAuthenticator,
        );

        let handler = ServiceProtocolClientHandler::new(
            builder,
            Arc::new(|| {
                let mut slots = ServiceSlots::new();
                slots.register_service::<Probe>();
                slots
            }),
            Arc::new(|| Duration::from_millis(5)),
            Arc::new(|_client| {}),
            test_logger(),
        );

        let client = handler.client().await;
        let reply = client.send_request::<Probe>(Empty).await;
        assert_eq!(reply, Ok(true));

        handler.close().await;
        server.close().await;
    }
}
