use crate::client::ServiceProtocolClient;
use crate::slots::{ClientHandle, ServiceSlots};
use async_trait::async_trait;
use beam_buffer::error::IoResult;
use beam_channel::Channel;
use beam_codec::{Decoder, Encoder};
use beam_protocol::MessageProtocol;
use slog::Logger;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// User-supplied business logic plugged into a
/// `ServiceProtocolServletContainer` (`Services/ServiceSlots.hpp`'s
/// `Servlet` concept, §4.8). One instance is shared across every
/// accepted connection; per-connection state belongs on the endpoint's
/// `Session`, not on the servlet.
pub trait Servlet: Send + Sync + 'static {
    /// When `true`, request handlers for *different* requests on the
    /// same endpoint may run concurrently; responses may then overtake
    /// each other. When `false` (the default), dispatch on one endpoint
    /// is strictly sequential — simpler invariants, guaranteed ordering.
    const SUPPORTS_PARALLELISM: bool = false;

    fn register_services(&self, slots: &mut ServiceSlots);

    fn handle_accept(&self, _client: ClientHandle) {}

    fn handle_close(&self, _client: ClientHandle) {}
}

/// Accepts `Channel`s for a `ServiceProtocolServletContainer`
/// (`Network/ServerConnection.hpp`'s `Accept` concept). Implemented for
/// `beam_channel::TcpServer`; test code typically implements it over an
/// `mpsc::Receiver<DuplexChannel>` fed by the test harness.
#[async_trait]
pub trait ChannelAcceptor: Send + Sync {
    type Channel: Channel + 'static;

    async fn accept(&self) -> IoResult<Self::Channel>;
}

#[async_trait]
impl ChannelAcceptor for beam_channel::TcpServer {
    type Channel = beam_channel::TcpChannel;

    async fn accept(&self) -> IoResult<Self::Channel> {
        beam_channel::TcpServer::accept(self).await
    }
}

/// Accepts channels handed to it one at a time over an internal queue;
/// lets tests drive a container without a real listening socket
/// (`ServiceLocatorTestEnvironment`'s local-channel acceptor idiom).
pub struct QueueAcceptor<C> {
    receiver: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<C>>,
}

impl<C: Channel + 'static> QueueAcceptor<C> {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedSender<C>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (QueueAcceptor { receiver: tokio::sync::Mutex::new(receiver) }, sender)
    }
}

#[async_trait]
impl<C: Channel + 'static> ChannelAcceptor for QueueAcceptor<C> {
    type Channel = C;

    async fn accept(&self) -> IoResult<C> {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(beam_buffer::IoError::EndOfFile)
    }
}

/// Accepts channels, instantiates a `ServiceProtocolClient` endpoint per
/// channel with the servlet's services registered, and runs until
/// closed (`Services/ServiceProtocolServletContainer.hpp`, §4.8).
pub struct ServiceProtocolServletContainer<A, S, E, D>
where
    A: ChannelAcceptor,
    S: Servlet,
    E: Encoder + Send + 'static,
    D: Decoder + Send + 'static,
{
    servlet: Arc<S>,
    encoder_factory: Arc<dyn Fn() -> E + Send + Sync>,
    decoder_factory: Arc<dyn Fn() -> D + Send + Sync>,
    heartbeat_interval: Duration,
    logger: Logger,
    endpoints: Mutex<Vec<Arc<ServiceProtocolClient>>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    _acceptor: std::marker::PhantomData<A>,
}

impl<A, S, E, D> ServiceProtocolServletContainer<A, S, E, D>
where
    A: ChannelAcceptor + 'static,
    S: Servlet,
    E: Encoder + Send + 'static,
    D: Decoder + Send + 'static,
{
    pub fn new(
        acceptor: A,
        servlet: S,
        encoder_factory: impl Fn() -> E + Send + Sync + 'static,
        decoder_factory: impl Fn() -> D + Send + Sync + 'static,
        heartbeat_interval: Duration,
        logger: Logger,
    ) -> Arc<Self> {
        let container = Arc::new(ServiceProtocolServletContainer {
            servlet: Arc::new(servlet),
            encoder_factory: Arc::new(encoder_factory),
            decoder_factory: Arc::new(decoder_factory),
            heartbeat_interval,
            logger,
            endpoints: Mutex::new(Vec::new()),
            accept_task: Mutex::new(None),
            _acceptor: std::marker::PhantomData,
        });
        let run_container = container.clone();
        let task = tokio::spawn(async move { run_container.run(acceptor).await });
        *container.accept_task.lock().unwrap() = Some(task);
        container
    }

    async fn run(self: Arc<Self>, acceptor: A) {
        loop {
            match acceptor.accept().await {
                Ok(channel) => self.accept_channel(channel),
                Err(e) => {
                    slog::warn!(self.logger, "acceptor closed"; "error" => %e);
                    return;
                }
            }
        }
    }

    fn accept_channel(self: &Arc<Self>, channel: A::Channel) {
        let encoder = (self.encoder_factory)();
        let decoder = (self.decoder_factory)();
        let transport: Arc<dyn beam_protocol::MessageTransport> =
            Arc::new(MessageProtocol::new(channel, encoder, decoder));

        let mut slots = ServiceSlots::new();
        self.servlet.register_services(&mut slots);

        let endpoint = ServiceProtocolClient::new(
            transport,
            Arc::new(slots),
            self.heartbeat_interval,
            S::SUPPORTS_PARALLELISM,
            self.logger.clone(),
        );

        self.endpoints.lock().unwrap().push(endpoint.clone());
        self.servlet.handle_accept(endpoint.clone());

        let servlet = self.servlet.clone();
        let container = self.clone();
        let watched = endpoint.clone();
        tokio::spawn(async move {
            watched.wait_closed().await;
            servlet.handle_close(watched.clone());
            container.endpoints.lock().unwrap().retain(|e| !Arc::ptr_eq(e, &watched));
        });
    }

    /// Closes the acceptor task and every live endpoint, waiting for
    /// each to finish tearing down (§4.8, §5).
    pub async fn close(&self) {
        if let Some(task) = self.accept_task.lock().unwrap().take() {
            task.abort();
        }
        let endpoints: Vec<_> = self.endpoints.lock().unwrap().drain(..).collect();
        for endpoint in endpoints {
            endpoint.close().await;
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceRequestException;
    use crate::slots::Service;
    use beam_channel::DuplexChannel;
    use beam_codec::{NullDecoder, NullEncoder};
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;

    struct Echo;
    impl Service for Echo {
        const UID: &'static str = "Test.Container.Echo";
        type Args = String;
        type Return = String;
    }

    struct EchoServlet;
    impl Servlet for EchoServlet {
        fn register_services(&self, slots: &mut ServiceSlots) {
            slots.add_slot::<Echo, _>(|_client, args| Ok(args));
        }
    }

    fn test_logger() -> Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn container_services_an_accepted_channel() {
        let (acceptor, sender) = QueueAcceptor::<DuplexChannel>::new();
        let container = ServiceProtocolServletContainer::new(
            acceptor,
            EchoServlet,
            || NullEncoder,
            || NullDecoder,
            Duration::from_secs(30),
            test_logger(),
        );

        let (client_channel, server_channel) = beam_channel::duplex_pair(8192);
        sender.send(server_channel).unwrap();

        let mut client_slots = ServiceSlots::new();
        client_slots.register_service::<Echo>();
        let client_transport: Arc<dyn beam_protocol::MessageTransport> =
            Arc::new(MessageProtocol::new(client_channel, NullEncoder, NullDecoder));
        let client = ServiceProtocolClient::new(
            client_transport,
            Arc::new(client_slots),
            Duration::from_secs(30),
            false,
            test_logger(),
        );

        let reply = client.send_request::<Echo>("ping".to_string()).await;
        assert_eq!(reply, Ok("ping".to_string()));

        client.close().await;
        container.close().await;
    }

    #[allow(dead_code)]
    fn assert_exception_type(_: ServiceRequestException) {}
}
