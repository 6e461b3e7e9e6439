use serde::de::DeserializeOwned;
use std::path::Path;

/// Loads a TOML configuration file into `T`
/// (`game/core/src/config.rs`'s `GameConfig::load`, generalised to any
/// config type a binary in this workspace defines).
pub fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> T {
    serdeconv::from_toml_file(path).expect("error loading configuration file")
}
