use beam_auth::AuthenticationServletAdapter;
use beam_channel::TcpServer;
use beam_codec::{ZLibDecoder, ZLibEncoder};
use beam_server::config::ServerConfig;
use beam_service::ServiceProtocolServletContainer;
use locator::{DataStore as LocatorDataStore, LocatorSessionAuthority, ServiceLocatorServlet};
use registry::{DataStore as RegistryDataStore, RegistryServlet};
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let logger = beam_support::logging::init_default();
    let config_path = env::args().nth(1).unwrap_or_else(|| "beam_server.toml".to_string());
    let config = ServerConfig::load(&config_path);
    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs);

    let locator_store = Arc::new(LocatorDataStore::new());
    locator_store.with_transaction(|state| {
        if state.find_account(&config.root_account.username).is_none() {
            state
                .bootstrap_root_account(&config.root_account.username, &config.root_account.password)
                .expect("seeding the root account failed");
        }
    });
    let registry_store = Arc::new(RegistryDataStore::new());

    let locator_acceptor = TcpServer::bind(config.listeners.locator_address).await.expect("failed to bind locator listener");
    slog::info!(logger, "listening for locator connections"; "address" => %config.listeners.locator_address);
    let locator_container = ServiceProtocolServletContainer::new(
        locator_acceptor,
        ServiceLocatorServlet::new(locator_store.clone()),
        ZLibEncoder::default,
        ZLibDecoder::default,
        heartbeat_interval,
        logger.clone(),
    );

    let registry_acceptor = TcpServer::bind(config.listeners.registry_address).await.expect("failed to bind registry listener");
    slog::info!(logger, "listening for registry connections"; "address" => %config.listeners.registry_address);
    let authority = LocatorSessionAuthority::new(locator_store.clone());
    let registry_container = ServiceProtocolServletContainer::new(
        registry_acceptor,
        AuthenticationServletAdapter::new(RegistryServlet::new(registry_store), authority),
        ZLibEncoder::default,
        ZLibDecoder::default,
        heartbeat_interval,
        logger.clone(),
    );

    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    slog::info!(logger, "shutting down");
    locator_container.close().await;
    registry_container.close().await;
}
