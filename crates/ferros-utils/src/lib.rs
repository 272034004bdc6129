//! # Ferros Utilities
//!
//! Shared utilities for the Ferros workspace, chiefly logging built on
//! `tracing`.

pub mod logging;

// Re-export commonly used logging items for convenience
pub use logging::{init_logging, init_test_logging, LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
