use crate::state::DataStore;
use crate::wire::*;
use beam_service::{Servlet, ServiceSlots};
use std::sync::Arc;

/// The reference registry (§4.11): a content tree of directories and
/// byte values, exposed as services of the same shape as the locator's.
/// Carries no authentication of its own — wrap it in
/// `beam_auth::AuthenticationServletAdapter` together with a
/// `locator::LocatorSessionAuthority` to require a prior locator login
/// (§4.9) before any of these slots run.
pub struct RegistryServlet {
    store: Arc<DataStore>,
}

impl RegistryServlet {
    pub fn new(store: Arc<DataStore>) -> Self {
        RegistryServlet { store }
    }

    pub fn store(&self) -> Arc<DataStore> {
        self.store.clone()
    }
}

impl Servlet for RegistryServlet {
    fn register_services(&self, slots: &mut ServiceSlots) {
        crate::wire::register_wire_types(slots);

        let store = self.store.clone();
        slots.add_slot::<LoadPathService, _>(move |_client, args| store.with_transaction(|state| state.load_path(args.id)));

        let store = self.store.clone();
        slots.add_slot::<LoadParentService, _>(move |_client, args| store.with_transaction(|state| state.load_parent(args.id)));

        let store = self.store.clone();
        slots.add_slot::<LoadChildrenService, _>(move |_client, args| store.with_transaction(|state| state.load_children(args.id)));

        let store = self.store.clone();
        slots.add_slot::<MakeDirectoryService, _>(move |_client, args| store.with_transaction(|state| state.make_directory(&args.name, args.parent)));

        let store = self.store.clone();
        slots.add_slot::<CopyService, _>(move |_client, args| store.with_transaction(|state| state.copy(args.source, args.new_parent, &args.new_name)));

        let store = self.store.clone();
        slots.add_slot::<MoveService, _>(move |_client, args| {
            store.with_transaction(|state| state.move_entry(args.id, args.new_parent))?;
            Ok(true)
        });

        let store = self.store.clone();
        slots.add_slot::<LoadValueService, _>(move |_client, args| store.with_transaction(|state| state.load_value(args.id)));

        let store = self.store.clone();
        slots.add_slot::<MakeValueService, _>(move |_client, args| store.with_transaction(|state| state.make_value(&args.name, args.parent)));

        let store = self.store.clone();
        slots.add_slot::<StoreValueService, _>(move |_client, args| {
            store.with_transaction(|state| state.store_value(args.id, args.value.clone()))?;
            Ok(true)
        });

        let store = self.store.clone();
        slots.add_slot::<DeleteService, _>(move |_client, args| {
            store.with_transaction(|state| state.delete(args.id))?;
            Ok(true)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ROOT_ID;
    use beam_auth::AuthenticationServletAdapter;
    use beam_channel::duplex_pair;
    use beam_codec::{NullDecoder, NullEncoder};
    use beam_protocol::{MessageProtocol, MessageTransport};
    use beam_service::ServiceProtocolClient;
    use locator::{DataStore as LocatorDataStore, LocatorSessionAuthority};
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;
    use std::time::Duration;

    fn test_logger() -> slog::Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    fn make_pair() -> (Arc<dyn MessageTransport>, Arc<dyn MessageTransport>) {
        let (client_channel, server_channel) = duplex_pair(8192);
        let client: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(client_channel, NullEncoder, NullDecoder));
        let server: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        (client, server)
    }

    #[tokio::test]
    async fn value_operations_require_a_prior_locator_login() {
        let locator_store = Arc::new(LocatorDataStore::new());
        locator_store.with_transaction(|state| state.make_account("root", "hunter2", locator::STAR_ID).unwrap());
        let session_id = locator_store.with_transaction(|state| state.login("root", "hunter2").unwrap().1);
        let authority = LocatorSessionAuthority::new(locator_store);

        let registry_store = Arc::new(DataStore::new());
        let inner = RegistryServlet::new(registry_store);
        let adapter = AuthenticationServletAdapter::new(inner, authority);

        let mut server_slots = ServiceSlots::new();
        adapter.register_services(&mut server_slots);

        let (client_transport, server_transport) = make_pair();
        let server = ServiceProtocolClient::new(server_transport, Arc::new(server_slots), Duration::from_secs(30), false, test_logger());

        let mut client_slots = ServiceSlots::new();
        crate::wire::register_wire_types(&mut client_slots);
        client_slots.register_service::<beam_auth::SendSessionIdService>();
        let client = ServiceProtocolClient::new(client_transport, Arc::new(client_slots), Duration::from_secs(30), false, test_logger());

        let before = client.send_request::<MakeValueService>(MakeValueArgs { name: "v".to_string(), parent: ROOT_ID }).await;
        assert!(before.is_err());

        beam_auth::Authenticator::authenticate(&client, "not-a-real-session").await.unwrap_err();
        beam_auth::Authenticator::authenticate(&client, &session_id).await.unwrap();

        let id = client
            .send_request::<MakeValueService>(MakeValueArgs { name: "v".to_string(), parent: ROOT_ID })
            .await
            .unwrap();
        client.send_request::<StoreValueService>(StoreValueArgs { id, value: b"hello".to_vec() }).await.unwrap();
        let loaded = client.send_request::<LoadValueService>(EntryIdArgs { id }).await.unwrap();
        assert_eq!(loaded, b"hello".to_vec());

        client.close().await;
        server.close().await;
    }
}
