//! Logging setup.
//!
//! Everything logs through the `log` facade; `init_logging` installs
//! `env_logger` once for binaries and tests that want output.

mod init;

pub use init::{init_logging, LoggingConfig};
