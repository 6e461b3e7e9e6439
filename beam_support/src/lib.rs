//! Ambient stack shared by `beam_server` and the reference services:
//! logging setup, TOML configuration loading, timestamps, and the
//! random/hash primitives the service-locator's accounts and sessions
//! are built on.

pub mod config;
pub mod crypto;
pub mod logging;
pub mod time;

pub use config::load_toml;
pub use time::timestamp_secs;
