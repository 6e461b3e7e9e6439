//! Config and wiring shared between `beam_server`'s main binary and its
//! config-generating sidecar (`game/runner`'s `main.rs`/`gamerunner_config.rs`
//! split).

pub mod config;
