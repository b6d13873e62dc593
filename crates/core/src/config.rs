//! Application Configuration
//!
//! Manages the settings consumed by project sync:
//! - Sync feature flags (model protocol, parallelism, prefetching)
//! - Android Gradle plugin version policy

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{RDroidError, Result};

/// Oldest Android Gradle plugin the sync engine can import.
pub const MINIMUM_SUPPORTED_AGP_VERSION: &str = "3.2.0";

/// Newest Android Gradle plugin this build knows about.
pub const LATEST_KNOWN_AGP_VERSION: &str = "8.1.0";

/// Feature flags read by a sync pass. Never mutated during a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncFlags {
    /// Request V2 builder models when the plugin supports them
    pub use_v2_builder_models: bool,
    /// Allow fetch batches to run on a worker pool
    pub parallel_sync_enabled: bool,
    /// Speculatively fetch previously selected variants before the walk
    pub parallel_sync_prefetch_variants_enabled: bool,
    /// Downgrade "different preview" plugin versions from a fatal error
    pub disable_forced_upgrades: bool,
    /// Worker threads used by the parallel action runner
    pub parallel_threads: usize,
}

impl Default for SyncFlags {
    fn default() -> Self {
        Self {
            use_v2_builder_models: true,
            parallel_sync_enabled: true,
            parallel_sync_prefetch_variants_enabled: true,
            disable_forced_upgrades: false,
            parallel_threads: num_cpus::get(),
        }
    }
}

/// Plugin versions the compatibility check is measured against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgpVersionPolicy {
    pub minimum_supported: String,
    pub latest_known: String,
}

impl Default for AgpVersionPolicy {
    fn default() -> Self {
        Self {
            minimum_supported: MINIMUM_SUPPORTED_AGP_VERSION.to_string(),
            latest_known: LATEST_KNOWN_AGP_VERSION.to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Sync flags
    pub sync: SyncFlags,
    /// Plugin version policy
    pub agp: AgpVersionPolicy,
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "rdroid", "R-Droid")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("sync.toml"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| RDroidError::Config("Cannot determine config path".into()))?;

        if config_file.exists() {
            Self::load_from(&config_file).await
        } else {
            info!("Config file not found, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from an explicit file
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RDroidError::NotFound(format!("{}", path.display())));
        }
        debug!("Loading config from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.sync.parallel_threads == 0 {
            return Err(RDroidError::Config("sync.parallel_threads must be at least 1".into()));
        }
        if self.agp.minimum_supported.trim().is_empty() || self.agp.latest_known.trim().is_empty() {
            return Err(RDroidError::Config("agp version policy must name both versions".into()));
        }
        Ok(())
    }
}
