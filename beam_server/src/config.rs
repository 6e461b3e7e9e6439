use serde_derive::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_LOCATOR_ADDRESS: &str = "0.0.0.0:20000";
pub const DEFAULT_REGISTRY_ADDRESS: &str = "0.0.0.0:20001";

/// The locator's first account, created if the data store is empty on
/// startup (`game/core/src/config.rs`'s `GameConfig`, generalised to the
/// service-locator/registry pair `beam_server` wires together).
#[derive(Serialize, Deserialize)]
pub struct RootAccount {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct Listeners {
    pub locator_address: SocketAddr,
    pub registry_address: SocketAddr,
}

#[derive(Serialize, Deserialize)]
pub struct ServerConfig {
    pub listeners: Listeners,
    pub root_account: RootAccount,
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            listeners: Listeners {
                locator_address: DEFAULT_LOCATOR_ADDRESS.parse().unwrap(),
                registry_address: DEFAULT_REGISTRY_ADDRESS.parse().unwrap(),
            },
            root_account: RootAccount { username: "root".to_string(), password: "change-me".to_string() },
            heartbeat_interval_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> ServerConfig {
        beam_support::config::load_toml(path)
    }
}
