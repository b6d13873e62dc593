//! Sync error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a [`BuildController`](crate::BuildController)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// The connected build tool predates the requested model or parameter
    #[error("Unsupported by the connected build tool: {0}")]
    UnsupportedVersion(String),
    #[error("Model request failed: {0}")]
    Failed(String),
}

/// Fatal sync error. Any of these aborts the whole sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("The project is using an incompatible version (AGP {version}) of the Android Gradle plugin. Minimum supported version is AGP {minimum}.")]
    AgpVersionTooOld { version: String, minimum: String },

    #[error("The project is using an incompatible preview version (AGP {version}) of the Android Gradle plugin. Current compatible version is AGP {latest_known}.")]
    AgpVersionIncompatible { version: String, latest_known: String },

    #[error("Failed to fetch {model} for {target}")]
    ModelFetch {
        model: &'static str,
        target: String,
        #[source]
        source: ControllerError,
    },

    #[error("Build tool returned no {model} for {target}")]
    MissingModel { model: &'static str, target: String },

    #[error("Resolved variant '{variant}' does not exist in {module_id}")]
    UnknownVariant { module_id: String, variant: String },

    #[error("Project identifier cannot be resolved. Build: {build_root}, ProjectPath: {project_path}")]
    UnresolvableProject { build_root: String, project_path: String },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Failed to start sync worker pool: {0}")]
    ThreadPool(String),
}

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Classification of a delivered sync failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    AgpVersionTooOld,
    AgpVersionIncompatible,
    Generic,
}

/// Structured error delivered to the model consumer in place of models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeAndroidSyncError {
    pub kind: SyncErrorKind,
    pub message: String,
    /// Plugin version, set for compatibility failures
    pub agp_version: Option<String>,
    /// Messages of the error's source chain, outermost first
    pub causes: Vec<String>,
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::AgpVersionTooOld { .. } => SyncErrorKind::AgpVersionTooOld,
            SyncError::AgpVersionIncompatible { .. } => SyncErrorKind::AgpVersionIncompatible,
            _ => SyncErrorKind::Generic,
        }
    }

    /// Whether the upgrade assistant should be offered for this failure
    pub fn is_upgrade_required(&self) -> bool {
        !matches!(self.kind(), SyncErrorKind::Generic)
    }

    pub fn to_ide_error(&self) -> IdeAndroidSyncError {
        let agp_version = match self {
            SyncError::AgpVersionTooOld { version, .. }
            | SyncError::AgpVersionIncompatible { version, .. } => Some(version.clone()),
            _ => None,
        };

        let mut causes = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }

        IdeAndroidSyncError {
            kind: self.kind(),
            message: self.to_string(),
            agp_version,
            causes,
        }
    }
}
