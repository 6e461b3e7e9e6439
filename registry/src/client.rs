use crate::entry::EntryId;
use crate::wire::*;
use beam_buffer::{Buffer, SharedBuffer};
use beam_protocol::MessageTransport;
use beam_serialize::{BufferReceiver, BufferSender, Sender, Shuttle};
use beam_service::{ServiceProtocolClient, ServiceRequestException, ServiceSlots};
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;

/// Typed convenience surface over a raw `ServiceProtocolClient` talking
/// to a `RegistryServlet` (§4.11, §6), analogous to
/// `locator::ServiceLocatorClient`.
pub struct RegistryClient {
    inner: Arc<ServiceProtocolClient>,
}

impl RegistryClient {
    pub fn new(transport: Arc<dyn MessageTransport>, heartbeat_interval: Duration, logger: Logger) -> Self {
        let mut slots = ServiceSlots::new();
        register_wire_types(&mut slots);
        slots.register_service::<beam_auth::SendSessionIdService>();
        let inner = ServiceProtocolClient::new(transport, Arc::new(slots), heartbeat_interval, false, logger);
        RegistryClient { inner }
    }

    pub fn inner(&self) -> &Arc<ServiceProtocolClient> {
        &self.inner
    }

    pub async fn close(&self) {
        self.inner.close().await;
    }

    pub async fn load_path(&self, id: EntryId) -> Result<Vec<EntryId>, ServiceRequestException> {
        self.inner.send_request::<LoadPathService>(EntryIdArgs { id }).await
    }

    pub async fn load_parent(&self, id: EntryId) -> Result<Option<EntryId>, ServiceRequestException> {
        self.inner.send_request::<LoadParentService>(EntryIdArgs { id }).await
    }

    pub async fn load_children(&self, id: EntryId) -> Result<Vec<EntryId>, ServiceRequestException> {
        self.inner.send_request::<LoadChildrenService>(EntryIdArgs { id }).await
    }

    pub async fn make_directory(&self, name: &str, parent: EntryId) -> Result<EntryId, ServiceRequestException> {
        self.inner.send_request::<MakeDirectoryService>(MakeDirectoryArgs { name: name.to_string(), parent }).await
    }

    pub async fn make_value(&self, name: &str, parent: EntryId) -> Result<EntryId, ServiceRequestException> {
        self.inner.send_request::<MakeValueService>(MakeValueArgs { name: name.to_string(), parent }).await
    }

    pub async fn store_value(&self, id: EntryId, value: Vec<u8>) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<StoreValueService>(StoreValueArgs { id, value }).await
    }

    pub async fn load_value(&self, id: EntryId) -> Result<Vec<u8>, ServiceRequestException> {
        self.inner.send_request::<LoadValueService>(EntryIdArgs { id }).await
    }

    pub async fn copy(&self, source: EntryId, new_parent: EntryId, new_name: &str) -> Result<EntryId, ServiceRequestException> {
        self.inner
            .send_request::<CopyService>(CopyArgs { source, new_parent, new_name: new_name.to_string() })
            .await
    }

    pub async fn move_entry(&self, id: EntryId, new_parent: EntryId) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<MoveService>(MoveArgs { id, new_parent }).await
    }

    pub async fn delete(&self, id: EntryId) -> Result<bool, ServiceRequestException> {
        self.inner.send_request::<DeleteService>(EntryIdArgs { id }).await
    }

    /// Loads a value and deserializes it through `beam_serialize`
    /// instead of handing back raw bytes (`RegistryClient.hpp`'s
    /// `Load<T>` template, §4.11 supplement).
    pub async fn load_typed_value<T: Shuttle>(&self, id: EntryId) -> Result<T, ServiceRequestException> {
        let bytes = self.load_value(id).await?;
        let mut receiver = BufferReceiver::new(&bytes);
        T::receive(&mut receiver, 0).map_err(|e| ServiceRequestException::new(format!("malformed stored value: {}", e)))
    }

    /// Serializes `value` through `beam_serialize` and stores it
    /// (`RegistryClient.hpp`'s `Store<T>` template).
    pub async fn store_typed_value<T: Shuttle>(&self, id: EntryId, value: &T) -> Result<bool, ServiceRequestException> {
        let mut buffer = SharedBuffer::new();
        {
            let mut sender = BufferSender::new(&mut buffer);
            value.send(&mut sender, 0);
        }
        self.store_value(id, buffer.data().to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servlet::RegistryServlet;
    use crate::state::DataStore;
    use beam_auth::AuthenticationServletAdapter;
    use beam_channel::duplex_pair;
    use beam_codec::{NullDecoder, NullEncoder};
    use beam_protocol::MessageProtocol;
    use locator::{DataStore as LocatorDataStore, LocatorSessionAuthority, STAR_ID};
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
    async fn typed_value_round_trips_through_shuttle() {
        let locator_store = Arc::new(LocatorDataStore::new());
        locator_store.with_transaction(|state| state.make_account("root", "hunter2", STAR_ID).unwrap());
        let session_id = locator_store.with_transaction(|state| state.login("root", "hunter2").unwrap().1);
        let authority = LocatorSessionAuthority::new(locator_store);

        let adapter = AuthenticationServletAdapter::new(RegistryServlet::new(Arc::new(DataStore::new())), authority);
        let mut server_slots = ServiceSlots::new();
        adapter.register_services(&mut server_slots);

        let (client_channel, server_channel) = duplex_pair(8192);
        let server_transport: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        let server = ServiceProtocolClient::new(server_transport, Arc::new(server_slots), Duration::from_secs(30), false, test_logger());

        let client_transport: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(client_channel, NullEncoder, NullDecoder));
        let client = RegistryClient::new(client_transport, Duration::from_secs(30), test_logger());
        beam_auth::Authenticator::authenticate(client.inner(), &session_id).await.unwrap();

        let id = client.make_value("port", crate::entry::ROOT_ID).await.unwrap();
        client.store_typed_value(id, &42i32).await.unwrap();
        let loaded: i32 = client.load_typed_value(id).await.unwrap();
        assert_eq!(loaded, 42);

        client.close().await;
        server.close().await;
    }
}
