//! Shared utilities for the ledgerway gateway.

pub mod logging;

pub use logging::{init_logging, LogFormat, ParseLogFormatError};
