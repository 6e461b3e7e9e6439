use crate::entry::EntryId;
use crate::wire::*;
use beam_channel::TcpChannelBuilder;
use beam_codec::{ZLibDecoder, ZLibEncoder};
use beam_protocol::{MessageProtocol, MessageTransport};
use beam_service::{ServiceProtocolClient, ServiceRequestException, ServiceSlots};
use slog::Logger;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const ACCOUNT_UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Typed convenience surface over a raw `ServiceProtocolClient` talking
/// to a `ServiceLocatorServlet` (§4.10, §6). The source exposes two
/// parallel naming conventions for this surface; this wraps only the
/// snake_case one (§9 open question).
pub struct ServiceLocatorClient {
    inner: Arc<ServiceProtocolClient>,
    account_updates: broadcast::Sender<EntryId>,
}

impl ServiceLocatorClient {
    pub fn new(transport: Arc<dyn MessageTransport>, heartbeat_interval: Duration, logger: Logger) -> Self {
        let mut slots = ServiceSlots::new();
        register_wire_types(&mut slots);
        let (account_updates, _) = broadcast::channel(ACCOUNT_UPDATE_CHANNEL_CAPACITY);
        let publisher = account_updates.clone();
        slots.add_message_slot::<AccountUpdateMessage, _>(move |_client, body| {
            // No receivers is the common case between `monitor_accounts`
            // calls; dropping the update is correct there.
            let _ = publisher.send(body.account);
        });
        let inner = ServiceProtocolClient::new(transport, Arc::new(slots), heartbeat_interval, false, logger);
        ServiceLocatorClient { inner, account_updates }
    }

    pub fn inner(&self) -> &Arc<ServiceProtocolClient> {
        &self.inner
    }

    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Streams the directory entries of accounts created or updated
    /// after a `monitor_accounts` subscription, pushed by the servlet as
    /// `AccountUpdateMessage` records (§4.10 supplement,
    /// `QueryClientPublisher.hpp`). A `ServiceProtocolClientHandler`'s
    /// `ReconnectHandler` must call `monitor_accounts` again on every
    /// reconnect (§7) — this stream only carries updates pushed over
    /// the connection that is current when each message arrives.
    pub fn subscribe_account_updates(&self) -> broadcast::Receiver<EntryId> {
        self.account_updates.subscribe()
    }

    pub async fn login(&self, name: &str, password: &str) -> Result<LoginResult, ServiceRequestException> {
        self.inner
            .send_request::<LoginService>(LoginArgs { name: name.to_string(), password: password.to_string() })
            .await
    }

    pub async fn authenticate_session(&self, key: &str, sha: &str) -> Result<bool, ServiceRequestException> {
        self.inner
            .send_request::<SessionAuthenticationService>(SessionAuthenticationArgs {
                key: key.to_string(),
                sha: sha.to_string(),
            })
            .await
    }

    pub async fn register(&self, name: &str, properties: &str, owner: EntryId) -> Result<i32, ServiceRequestException> {
        self.inner
            .send_request::<RegisterService>(RegisterArgs { name: name.to_string(), properties: properties.to_string(), owner })
            .await
    }

    pub async fn unregister(&self, name: &str, id: i32) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<UnregisterService>(UnregisterArgs { name: name.to_string(), id }).await
    }

    pub async fn locate(&self, name: &str) -> Result<Vec<ServiceEntryInfo>, ServiceRequestException> {
        self.inner.send_request::<LocateService>(LocateArgs { name: name.to_string() }).await
    }

    pub async fn subscribe_availability(&self, name: &str) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<SubscribeAvailabilityService>(SubscribeAvailabilityArgs { name: name.to_string() }).await
    }

    pub async fn unsubscribe_availability(&self, name: &str) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<UnsubscribeAvailabilityService>(SubscribeAvailabilityArgs { name: name.to_string() }).await
    }

    pub async fn monitor_directory_entry(&self, id: EntryId) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<MonitorDirectoryEntryService>(MonitorDirectoryEntryArgs { id }).await
    }

    pub async fn monitor_accounts(&self) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<MonitorAccountsService>(Empty {}).await
    }

    pub async fn unmonitor_accounts(&self) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<UnmonitorAccountsService>(Empty {}).await
    }

    pub async fn load_path(&self, id: EntryId) -> Result<Vec<EntryId>, ServiceRequestException> {
        self.inner.send_request::<LoadPathService>(EntryIdArgs { id }).await
    }

    pub async fn load_directory_entry(&self, id: EntryId) -> Result<DirectoryEntryInfo, ServiceRequestException> {
        self.inner.send_request::<LoadDirectoryEntryService>(EntryIdArgs { id }).await
    }

    pub async fn load_parents(&self, id: EntryId) -> Result<Vec<EntryId>, ServiceRequestException> {
        self.inner.send_request::<LoadParentsService>(EntryIdArgs { id }).await
    }

    pub async fn load_children(&self, id: EntryId) -> Result<Vec<EntryId>, ServiceRequestException> {
        self.inner.send_request::<LoadChildrenService>(EntryIdArgs { id }).await
    }

    pub async fn load_all_accounts(&self) -> Result<Vec<EntryId>, ServiceRequestException> {
        self.inner.send_request::<LoadAllAccountsService>(Empty {}).await
    }

    pub async fn find_account(&self, name: &str) -> Result<Option<EntryId>, ServiceRequestException> {
        self.inner.send_request::<FindAccountService>(FindAccountArgs { name: name.to_string() }).await
    }

    pub async fn make_account(&self, name: &str, password: &str, parent: EntryId) -> Result<EntryId, ServiceRequestException> {
        self.inner
            .send_request::<MakeAccountService>(MakeAccountArgs { name: name.to_string(), password: password.to_string(), parent })
            .await
    }

    pub async fn make_directory(&self, name: &str, parent: EntryId) -> Result<EntryId, ServiceRequestException> {
        self.inner.send_request::<MakeDirectoryService>(MakeDirectoryArgs { name: name.to_string(), parent }).await
    }

    pub async fn delete_directory_entry(&self, id: EntryId) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<DeleteDirectoryEntryService>(EntryIdArgs { id }).await
    }

    pub async fn associate(&self, child: EntryId, parent: EntryId) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<AssociateService>(AssociationArgs { child, parent }).await
    }

    pub async fn detach(&self, child: EntryId, parent: EntryId) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<DetachService>(AssociationArgs { child, parent }).await
    }

    pub async fn store_password(&self, account: EntryId, password: &str) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<StorePasswordService>(StorePasswordArgs { account, password: password.to_string() }).await
    }

    pub async fn has_permissions(&self, source: EntryId, target: EntryId, mask: u8) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<HasPermissionsService>(PermissionsArgs { source, target, mask }).await
    }

    pub async fn store_permissions(&self, source: EntryId, target: EntryId, mask: u8) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<StorePermissionsService>(PermissionsArgs { source, target, mask }).await
    }

    pub async fn load_registration_time(&self, id: EntryId) -> Result<Option<u64>, ServiceRequestException> {
        self.inner.send_request::<LoadRegistrationTimeService>(EntryIdArgs { id }).await
    }

    pub async fn load_last_login_time(&self, id: EntryId) -> Result<Option<u64>, ServiceRequestException> {
        self.inner.send_request::<LoadLastLoginTimeService>(EntryIdArgs { id }).await
    }

    pub async fn rename(&self, id: EntryId, name: &str) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<RenameService>(RenameArgs { id, name: name.to_string() }).await
    }

    pub async fn authenticate_account(&self, name: &str, password: &str) -> Result<bool, ServiceRequestException> {
        self.inner
            .send_request::<AuthenticateAccountService>(AuthenticateAccountArgs { name: name.to_string(), password: password.to_string() })
            .await
    }
}

/// Address and credentials [`connect`] needs to reach a
/// `ServiceLocatorServlet` (`ServiceLocator/ApplicationDefinitions.hpp`'s
/// `ServiceLocatorClientConfig`, §4.10 supplement).
#[derive(Debug, Clone)]
pub struct ServiceLocatorClientConfig {
    pub address: SocketAddr,
    pub username: String,
    pub password: String,
    pub heartbeat_interval: Duration,
}

/// Failure connecting to, or logging into, a service-locator instance.
#[derive(Debug)]
pub enum LocatorConnectError {
    Io(beam_buffer::IoError),
    Login(ServiceRequestException),
}

impl fmt::Display for LocatorConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorConnectError::Io(e) => write!(f, "connection failed: {}", e),
            LocatorConnectError::Login(e) => write!(f, "login failed: {}", e),
        }
    }
}

impl std::error::Error for LocatorConnectError {}

impl From<beam_buffer::IoError> for LocatorConnectError {
    fn from(e: beam_buffer::IoError) -> Self {
        LocatorConnectError::Io(e)
    }
}

impl From<ServiceRequestException> for LocatorConnectError {
    fn from(e: ServiceRequestException) -> Self {
        LocatorConnectError::Login(e)
    }
}

/// Connects to a `ServiceLocatorServlet` over TCP and logs in with
/// `config`'s credentials, handing back the ready client and the
/// account's directory entry and session id
/// (`ApplicationServiceLocatorClient`'s constructor). Callers that then
/// talk to other servlets (`registry`, a custom service) pass the
/// returned session id to `beam_auth::Authenticator::authenticate`
/// against each one in turn.
pub async fn connect(config: &ServiceLocatorClientConfig, logger: Logger) -> Result<(ServiceLocatorClient, LoginResult), LocatorConnectError> {
    let channel = TcpChannelBuilder::new(config.address).connect().await?;
    let transport: Arc<dyn MessageTransport> =
        Arc::new(MessageProtocol::new(channel, ZLibEncoder::default(), ZLibDecoder::default()));
    let client = ServiceLocatorClient::new(transport, config.heartbeat_interval, logger);
    let login = client.login(&config.username, &config.password).await?;
    Ok((client, login))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servlet::ServiceLocatorServlet;
    use crate::state::DataStore;
    use beam_channel::duplex_pair;
    use beam_codec::{NullDecoder, NullEncoder};
    use beam_service::Servlet;
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;

    fn test_logger() -> Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn subscribed_account_updates_arrive_after_monitor_accounts() {
        let store = Arc::new(DataStore::new());
        store.with_transaction(|state| state.bootstrap_root_account("root", "hunter2").unwrap());
        let servlet = ServiceLocatorServlet::new(store);

        let (client_channel, server_channel) = duplex_pair(8192);
        let server_transport: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        let mut server_slots = ServiceSlots::new();
        servlet.register_services(&mut server_slots);
        let server = ServiceProtocolClient::new(server_transport, Arc::new(server_slots), Duration::from_secs(30), false, test_logger());

        let client_transport: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(client_channel, NullEncoder, NullDecoder));
        let client = ServiceLocatorClient::new(client_transport, Duration::from_secs(30), test_logger());
        client.login("root", "hunter2").await.unwrap();

        let mut updates = client.subscribe_account_updates();
        assert_eq!(client.monitor_accounts().await, Ok(true));

        let created = client.make_account("trader", "hunter2", crate::entry::STAR_ID).await.unwrap();
        let pushed = updates.recv().await.unwrap();
        assert_eq!(pushed, created);

        client.close().await;
        server.close().await;
    }
}

#[cfg(test)]
mod connect_tests {
    use super::*;
    use crate::servlet::ServiceLocatorServlet;
    use crate::state::DataStore;
    use beam_channel::TcpServer;
    use beam_service::Servlet;
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;

    fn test_logger() -> Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn connect_logs_in_over_a_real_socket() {
        let store = Arc::new(DataStore::new());
        store.with_transaction(|state| state.make_account("trader", "hunter2", crate::entry::STAR_ID).unwrap());
        let servlet = ServiceLocatorServlet::new(store.clone());

        let server = TcpServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let address = server.local_addr().unwrap();

        let accept_logger = test_logger();
        let accepted = tokio::spawn(async move {
            let channel = server.accept().await.unwrap();
            let transport: Arc<dyn MessageTransport> =
                Arc::new(MessageProtocol::new(channel, ZLibEncoder::default(), ZLibDecoder::default()));
            let mut slots = ServiceSlots::new();
            servlet.register_services(&mut slots);
            ServiceProtocolClient::new(transport, Arc::new(slots), Duration::from_secs(30), false, accept_logger)
        });

        let config = ServiceLocatorClientConfig {
            address,
            username: "trader".to_string(),
            password: "hunter2".to_string(),
            heartbeat_interval: Duration::from_secs(30),
        };
        let (client, login) = connect(&config, test_logger()).await.unwrap();
        assert!(!login.session_id.is_empty());
        assert_eq!(store.with_transaction(|state| state.find_account("trader")), Some(login.account));

        let server_side = accepted.await.unwrap();
        client.close().await;
        server_side.close().await;
    }
}
