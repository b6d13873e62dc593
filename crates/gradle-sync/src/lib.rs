//! R-Droid Gradle Sync - Model fetching and variant resolution
//!
//! Imports a Gradle build into the IDE model. One sync pass discovers
//! every project, fetches its Android plugin models over either builder
//! protocol, resolves which build variant each module syncs, and hands
//! the resulting module records to a [`BuildModelConsumer`].

pub mod artifacts;
pub mod consumer;
pub mod controller;
pub mod error;
pub mod fixture;
pub mod issues;
pub mod model;
pub mod model_cache;
pub mod module;
pub mod options;
pub mod project_result;
pub mod protocol;
pub mod resolver;
pub mod runner;
pub mod selection;
pub mod variants;
pub mod version;
pub mod worker;

pub use consumer::{BuildModelConsumer, DeliveredModel, Delivery, DeliveryTarget};
pub use controller::{BuildController, ControllerExt, Model, ModelRequest, Target};
pub use error::{ControllerError, IdeAndroidSyncError, Result, SyncError, SyncErrorKind};
pub use fixture::{BuildFixture, FixtureController};
pub use model_cache::ModelCache;
pub use module::{AndroidModule, GradleModule, ModuleConfiguration, SyncedAndroidModule};
pub use options::SyncOptions;
pub use runner::ActionRunner;
pub use selection::{SelectedVariant, SelectedVariants, VariantDetails};
pub use version::{AgpVersion, CompatibilityChecker};
pub use worker::ModelProviderWorker;
