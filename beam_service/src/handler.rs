use crate::client::ServiceProtocolClient;
use crate::slots::ServiceSlots;
use async_trait::async_trait;
use slog::Logger;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Instantiates a fresh, ready-to-use `ServiceProtocolClient` given a
/// freshly built `ServiceSlots` table (`Services/
/// ServiceProtocolClientBuilder.hpp`'s `MakeClient`). A failure is
/// always treated as transient by the handler — it backs off and
/// retries rather than giving up, matching the source's retry-on-
/// `ConnectException` loop in `ServiceProtocolClientHandler::GetClient`.
#[async_trait]
pub trait ClientBuilder: Send + Sync + 'static {
    type Error: fmt::Display + Send + 'static;

    async fn build(&self, slots: ServiceSlots) -> Result<Arc<ServiceProtocolClient>, Self::Error>;
}

/// Called with every newly (re)connected client, on both the first
/// connection and every reconnect — the hook a caller uses to replay
/// re-authentication, re-registration, and re-subscription (§5's
/// "Reconnection" paragraph; `ServiceProtocolClientHandler::
/// ReconnectHandler`).
pub type ReconnectHandler = Arc<dyn Fn(Arc<ServiceProtocolClient>) + Send + Sync>;

/// Builds a fresh `ServiceSlots` table for each (re)connect attempt —
/// a table's `TypeRegistry` tags are assigned by registration order, so
/// a rebuilt client needs its own table populated the same way every
/// time, not a re-used one carrying stale handler closures.
pub type SlotsFactory = Arc<dyn Fn() -> ServiceSlots + Send + Sync>;

/// Returns the backoff to wait before the next reconnect attempt
/// (`ServiceProtocolClientBuilder::MakeTimer`, generalised from a timer
/// object to the duration it would have waited for).
pub type BackoffFactory = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Owns at most one live `ServiceProtocolClient` at a time
/// (`Services/ServiceProtocolClientHandler.hpp`, §5). On construction,
/// and again every time the current client closes (peer loss, protocol
/// error, heartbeat timeout), it rebuilds the client through `builder`,
/// waiting `backoff()` between failed attempts, then calls
/// `reconnect_handler` with the new client before handing it out via
/// `client()`.
pub struct ServiceProtocolClientHandler<B: ClientBuilder> {
    builder: B,
    slots_factory: SlotsFactory,
    backoff: BackoffFactory,
    reconnect_handler: ReconnectHandler,
    logger: Logger,
    current: watch::Receiver<Option<Arc<ServiceProtocolClient>>>,
    closed: Arc<AtomicBool>,
    run_task: Mutex<Option<JoinHandle<()>>>,
}

impl<B: ClientBuilder> ServiceProtocolClientHandler<B> {
    pub fn new(
        builder: B,
        slots_factory: SlotsFactory,
        backoff: BackoffFactory,
        reconnect_handler: ReconnectHandler,
        logger: Logger,
    ) -> Arc<Self> {
        let (sender, receiver) = watch::channel(None);
        let closed = Arc::new(AtomicBool::new(false));
        let handler = Arc::new(ServiceProtocolClientHandler {
            builder,
            slots_factory,
            backoff,
            reconnect_handler,
            logger,
            current: receiver,
            closed,
            run_task: Mutex::new(None),
        });

        let run_handler = handler.clone();
        let task = tokio::spawn(async move { run_handler.run(sender).await });
        // `run_task` is only ever read from `close`, after construction
        // has returned the `Arc` to the caller; a `try_lock` here would
        // always succeed, but a real lock keeps this honest under
        // future refactors.
        if let Ok(mut slot) = handler.run_task.try_lock() {
            *slot = Some(task);
        }
        handler
    }

    async fn run(self: Arc<Self>, sender: watch::Sender<Option<Arc<ServiceProtocolClient>>>) {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            let client = match self.connect_with_backoff().await {
                Some(client) => client,
                None => return,
            };
            (self.reconnect_handler)(client.clone());
            if sender.send(Some(client.clone())).is_err() {
                return;
            }
            client.wait_closed().await;
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            slog::info!(self.logger, "service protocol client handler lost its connection, reconnecting");
        }
    }

    async fn connect_with_backoff(&self) -> Option<Arc<ServiceProtocolClient>> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            match self.builder.build((self.slots_factory)()).await {
                Ok(client) => return Some(client),
                Err(e) => {
                    slog::warn!(self.logger, "reconnect attempt failed"; "error" => %e);
                    tokio::time::sleep((self.backoff)()).await;
                }
            }
        }
    }

    /// Returns the current client, waiting for the first successful
    /// connection (or a reconnect in progress) to complete.
    pub async fn client(&self) -> Arc<ServiceProtocolClient> {
        let mut current = self.current.clone();
        loop {
            if let Some(client) = current.borrow().clone() {
                return client;
            }
            if current.changed().await.is_err() {
                // The sender was dropped, which only happens once `run`
                // has returned after `close`; park forever rather than
                // return a dangling client to a caller that didn't check.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Closes the current client (if any) and stops reconnecting.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(client) = self.current.borrow().clone() {
            client.close().await;
        }
        if let Some(task) = self.run_task.lock().await.take() {
            task.abort();
        }
    }
}
