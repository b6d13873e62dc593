//! R-Droid Sync - Gradle project sync
//!
//! Imports a Gradle build into IDE models: discovers projects, fetches
//! Android plugin models and resolves the build variant of every module.
//!
//! ## Architecture
//!
//! - `r-droid-core`: configuration and shared errors
//! - `r-droid-gradle-sync`: model fetching and variant resolution
//! - `commands`: command line front end over a fixture build

pub mod commands;

// Re-export main components for library usage
pub use r_droid_core as core;
pub use r_droid_gradle_sync as gradle_sync;

/// Prelude module for convenient imports
pub mod prelude {
    pub use r_droid_core::config::AppConfig;
    pub use r_droid_gradle_sync::{BuildController, BuildModelConsumer, Delivery, ModelProviderWorker, SyncOptions};
}
