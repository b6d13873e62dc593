//! R-Droid Core - Shared configuration and error types
//!
//! Settings and errors shared by the sync engine and the command line
//! front end.

pub mod config;
pub mod error;

pub use config::{AgpVersionPolicy, AppConfig, SyncFlags};
pub use error::{RDroidError, Result};

/// R-Droid version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "R-Droid 2026";
