//! Logging utilities.
//!
//! Centralizes logger initialization. Everything else in the crate logs through
//! the `log` facade; the owner and render threads are told apart by thread name.

mod init;

pub use init::{init_logging, LoggingConfig};
