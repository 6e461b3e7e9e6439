use crate::error::ServiceRequestException;
use crate::session::Session;
use crate::slots::{RecordMessageType, Service, ServiceSlots};
use beam_buffer::error::IoError;
use beam_buffer::{Buffer, SharedBuffer};
use beam_protocol::{Message, MessageTransport};
use beam_serialize::{BufferReceiver, BufferSender, Sender, Shuttle};
use hashbrown::HashMap;
use slog::Logger;
use std::io;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    Open,
    Closed,
}

type PendingTable = Mutex<HashMap<i32, oneshot::Sender<Result<Vec<u8>, ServiceRequestException>>>>;

/// A correlated RPC + one-way-message endpoint over a `MessageTransport`
/// (`Services/ServiceProtocolClient.hpp`), with its own heartbeat timer.
/// One instance exists per live `Channel` on both the client side and,
/// inside the servlet container, per accepted connection.
pub struct ServiceProtocolClient {
    transport: Arc<dyn MessageTransport>,
    slots: Arc<ServiceSlots>,
    session: Mutex<Session>,
    next_request_id: AtomicI32,
    pending: PendingTable,
    state: Mutex<ClientState>,
    last_activity: Mutex<Instant>,
    heartbeat_interval: Duration,
    supports_parallelism: bool,
    logger: Logger,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
    closed_notify: Notify,
}

fn encode_value<T: Shuttle>(value: &T) -> Vec<u8> {
    let mut buffer = SharedBuffer::new();
    {
        let mut sender = BufferSender::new(&mut buffer);
        value.send(&mut sender, 0);
    }
    buffer.data().to_vec()
}

impl ServiceProtocolClient {
    /// Builds a client endpoint and immediately spawns its
    /// receive-and-dispatch loop and heartbeat pump as background
    /// tasks, matching `ServiceProtocolClient`'s `INIT -> OPEN`
    /// transition on construction (§4.6).
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        slots: Arc<ServiceSlots>,
        heartbeat_interval: Duration,
        supports_parallelism: bool,
        logger: Logger,
    ) -> Arc<Self> {
        let client = Arc::new(ServiceProtocolClient {
            transport,
            slots,
            session: Mutex::new(Session::new()),
            next_request_id: AtomicI32::new(1),
            pending: Mutex::new(HashMap::new()),
            state: Mutex::new(ClientState::Open),
            last_activity: Mutex::new(Instant::now()),
            heartbeat_interval,
            supports_parallelism,
            logger,
            dispatch_task: Mutex::new(None),
            heartbeat_task: Mutex::new(None),
            closed_notify: Notify::new(),
        });

        let dispatch_client = client.clone();
        let dispatch_task = tokio::spawn(async move { dispatch_client.run_dispatch_loop().await });
        *client.dispatch_task.lock().unwrap() = Some(dispatch_task);

        let heartbeat_client = client.clone();
        let heartbeat_task = tokio::spawn(async move { heartbeat_client.run_heartbeat_loop().await });
        *client.heartbeat_task.lock().unwrap() = Some(heartbeat_task);

        client
    }

    pub fn slots(&self) -> &ServiceSlots {
        &self.slots
    }

    pub fn session(&self) -> Session {
        self.session.lock().unwrap().clone()
    }

    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.session.lock().unwrap())
    }

    pub fn is_closed(&self) -> bool {
        *self.state.lock().unwrap() == ClientState::Closed
    }

    /// Resolves once this endpoint has closed, for the servlet container
    /// to know when to call `Servlet::handle_close`.
    pub async fn wait_closed(&self) {
        loop {
            if self.is_closed() {
                return;
            }
            let notified = self.closed_notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    /// Allocates a `request_id`, sends `Request`, and waits on the
    /// matching promise — `send_request`'s contract is synchronous from
    /// the caller's standpoint even though nothing it does blocks the
    /// network (§4.6).
    pub async fn send_request<S: Service>(&self, args: S::Args) -> Result<S::Return, ServiceRequestException> {
        if self.is_closed() {
            return Err(ServiceRequestException::new("endpoint is closed"));
        }
        let tag = self.slots.tag_for_uid(S::UID).unwrap_or_else(|| {
            panic!("service {} was never registered on this endpoint", S::UID)
        });
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().unwrap().insert(request_id, sender);

        let body = encode_value(&args);
        let message = Message::Request { request_id, type_tag: tag, body };
        if let Err(e) = self.transport.send(&message).await {
            self.pending.lock().unwrap().remove(&request_id);
            return Err(ServiceRequestException::new(format!("send failed: {}", e)));
        }

        match receiver.await {
            Ok(Ok(bytes)) => {
                let mut receiver = BufferReceiver::new(&bytes);
                S::Return::receive(&mut receiver, 0)
                    .map_err(|e| ServiceRequestException::new(format!("malformed response: {}", e)))
            }
            Ok(Err(exception)) => Err(exception),
            Err(_) => Err(ServiceRequestException::new("connection closed before a response arrived")),
        }
    }

    /// Sends a one-way `Record` message; best-effort, no response is
    /// ever expected (§4.6, §7).
    pub async fn send<M: RecordMessageType>(&self, body: M::Body) -> Result<(), IoError> {
        let tag = self.slots.tag_for_uid(M::UID).unwrap_or_else(|| {
            panic!("message {} was never registered on this endpoint", M::UID)
        });
        let encoded = encode_value(&body);
        self.transport.send(&Message::Record { type_tag: tag, body: encoded }).await
    }

    /// Idempotent; fails every outstanding promise with an `IOException`
    /// and cancels the heartbeat timer and dispatch loop (§5).
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == ClientState::Closed {
                return;
            }
            *state = ClientState::Closed;
        }
        slog::info!(self.logger, "closing service protocol client endpoint");
        self.fail_all_pending(ServiceRequestException::new("IOException: endpoint closed"));
        if let Some(task) = self.dispatch_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(task) = self.heartbeat_task.lock().unwrap().take() {
            task.abort();
        }
        self.closed_notify.notify_waiters();
    }

    fn fail_all_pending(&self, exception: ServiceRequestException) {
        let mut pending = self.pending.lock().unwrap();
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(exception.clone()));
        }
    }

    async fn run_dispatch_loop(self: Arc<Self>) {
        loop {
            match self.transport.receive().await {
                Ok(message) => {
                    *self.last_activity.lock().unwrap() = Instant::now();
                    self.handle_message(message).await;
                    if self.is_closed() {
                        return;
                    }
                }
                Err(e) => {
                    slog::warn!(self.logger, "transport closed"; "error" => %e);
                    self.tear_down(format!("IOException: {}", e)).await;
                    return;
                }
            }
        }
    }

    async fn run_heartbeat_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            if self.is_closed() {
                return;
            }
            let elapsed = self.last_activity.lock().unwrap().elapsed();
            if elapsed > self.heartbeat_interval * 2 {
                slog::warn!(self.logger, "heartbeat timeout"; "elapsed_ms" => elapsed.as_millis() as u64);
                let timeout = IoError::Io(io::Error::new(io::ErrorKind::TimedOut, "heartbeat timeout"));
                self.tear_down(format!("IOException: {}", timeout)).await;
                return;
            }
            if self.transport.send(&Message::Heartbeat).await.is_err() {
                self.tear_down("IOException: heartbeat send failed".to_string()).await;
                return;
            }
        }
    }

    async fn tear_down(self: &Arc<Self>, reason: String) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == ClientState::Closed {
                return;
            }
            *state = ClientState::Closed;
        }
        self.fail_all_pending(ServiceRequestException::new(reason));
        self.closed_notify.notify_waiters();
    }

    async fn handle_message(self: &Arc<Self>, message: Message) {
        match message {
            Message::Heartbeat => {}
            Message::Response { request_id, is_exception, body, .. } => {
                self.complete_pending(request_id, is_exception, body);
            }
            Message::Request { request_id, type_tag, body } => {
                let client = self.clone();
                let session = self.session();
                match self.slots.dispatch_request(client.clone(), &session, type_tag, body) {
                    Ok(future) => {
                        if self.supports_parallelism {
                            let client = self.clone();
                            tokio::spawn(async move {
                                let result = future.await;
                                client.respond(request_id, result).await;
                            });
                        } else {
                            let result = future.await;
                            self.respond(request_id, result).await;
                        }
                    }
                    Err(e) => {
                        slog::warn!(self.logger, "malformed request"; "error" => %e);
                        self.tear_down(format!("DecoderException: {}", e)).await;
                    }
                }
            }
            Message::Record { type_tag, body } => {
                let client = self.clone();
                let session = self.session();
                if let Err(e) = self.slots.dispatch_message(client, &session, type_tag, body) {
                    slog::warn!(self.logger, "malformed one-way message"; "error" => %e);
                    self.tear_down(format!("DecoderException: {}", e)).await;
                }
            }
        }
    }

    async fn respond(self: &Arc<Self>, request_id: i32, result: Result<Vec<u8>, ServiceRequestException>) {
        let (is_exception, body) = match result {
            Ok(bytes) => (false, bytes),
            Err(exception) => (true, encode_value(&exception)),
        };
        let message = Message::Response { request_id, is_exception, type_tag: 0, body };
        if self.transport.send(&message).await.is_err() {
            self.tear_down("IOException: failed to send response".to_string()).await;
        }
    }

    /// Completes the pending promise for `request_id`. An id with no
    /// matching entry is a protocol violation — a duplicate or unknown
    /// response — and tears the endpoint down (§4.6 invariants).
    fn complete_pending(self: &Arc<Self>, request_id: i32, is_exception: bool, body: Vec<u8>) {
        let sender = self.pending.lock().unwrap().remove(&request_id);
        let sender = match sender {
            Some(sender) => sender,
            None => {
                let client = self.clone();
                tokio::spawn(async move {
                    client
                        .tear_down(format!("protocol error: unknown response id {}", request_id))
                        .await;
                });
                return;
            }
        };
        let result = if is_exception {
            let mut receiver = BufferReceiver::new(&body);
            match ServiceRequestException::receive(&mut receiver, 0) {
                Ok(exception) => Err(exception),
                Err(e) => Err(ServiceRequestException::new(format!("malformed exception: {}", e))),
            }
        } else {
            Ok(body)
        };
        let _ = sender.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::ClientHandle;
    use beam_channel::duplex_pair;
    use beam_codec::{NullDecoder, NullEncoder};
    use beam_protocol::MessageProtocol;
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;

    struct Echo;
    impl Service for Echo {
        const UID: &'static str = "Test.Echo";
        type Args = String;
        type Return = String;
    }

    fn test_logger() -> Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    fn make_pair() -> (Arc<dyn MessageTransport>, Arc<dyn MessageTransport>) {
        let (client_channel, server_channel) = duplex_pair(8192);
        let client: Arc<dyn MessageTransport> =
            Arc::new(MessageProtocol::new(client_channel, NullEncoder, NullDecoder));
        let server: Arc<dyn MessageTransport> =
            Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        (client, server)
    }

    #[tokio::test]
    async fn echo_request_round_trips() {
        let (client_transport, server_transport) = make_pair();

        let mut server_slots = ServiceSlots::new();
        server_slots.add_slot::<Echo, _>(|_client: ClientHandle, args| Ok(args));
        let server = ServiceProtocolClient::new(
            server_transport,
            Arc::new(server_slots),
            Duration::from_secs(30),
            false,
            test_logger(),
        );

        let mut client_slots = ServiceSlots::new();
        client_slots.register_service::<Echo>();
        let client = ServiceProtocolClient::new(
            client_transport,
            Arc::new(client_slots),
            Duration::from_secs(30),
            false,
            test_logger(),
        );

        let reply = client.send_request::<Echo>("hello world".to_string()).await.unwrap();
        assert_eq!(reply, "hello world");

        client.close().await;
        server.close().await;
    }

    #[tokio::test]
    async fn closing_fails_outstanding_requests() {
        let (client_transport, server_transport) = make_pair();
        // The server never completes the request, so the only way the
        // caller's future resolves is via `close`'s `fail_all_pending`.
        let mut server_slots = ServiceSlots::new();
        server_slots.add_request_slot::<Echo, _>(|_client: ClientHandle, _token, _args| {});
        let server = ServiceProtocolClient::new(
            server_transport,
            Arc::new(server_slots),
            Duration::from_secs(30),
            false,
            test_logger(),
        );

        let mut client_slots = ServiceSlots::new();
        client_slots.register_service::<Echo>();
        let client = ServiceProtocolClient::new(
            client_transport,
            Arc::new(client_slots),
            Duration::from_secs(30),
            false,
            test_logger(),
        );

        let pending_client = client.clone();
        let request_task =
            tokio::spawn(async move { pending_client.send_request::<Echo>("hi".to_string()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.close().await;

        let result = request_task.await.unwrap();
        assert!(result.is_err());
        server.close().await;
    }
}
