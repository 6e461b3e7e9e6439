use sloggers::{Build, Config, LoggerConfig};
use std::path::Path;

/// Debug-level terminal logger, for binaries with no config file of
/// their own yet.
pub fn init_default() -> slog::Logger {
    let config: LoggerConfig = serdeconv::from_toml_str(
        r#"
type = "terminal"
level = "debug"
destination = "stderr"
"#,
    )
    .expect("default logging config is valid toml");
    config.build_logger().expect("failed to build default logger")
}

/// Builds a logger from a `sloggers::LoggerConfig` TOML file, the
/// config-driven counterpart of [`init_default`].
pub fn init_from_file<P: AsRef<Path>>(path: P) -> slog::Logger {
    let config: LoggerConfig =
        serdeconv::from_toml_file(path).expect("error loading logging configuration file");
    config.build_logger().expect("failed to build logger from config")
}
