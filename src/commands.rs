//! CLI commands for R-Droid sync
//!
//! Runs a sync pass against a fixture build described as JSON and
//! returns the delivered models.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{info, warn};

use r_droid_core::config::AppConfig;
use r_droid_gradle_sync::options::{AllVariantsSyncOptions, NativeVariantsSyncOptions};
use r_droid_gradle_sync::{DeliveredModel, Delivery, FixtureController, ModelProviderWorker, SyncOptions};

/// Sync mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncMode {
    /// One variant per module, chosen from the previous selection
    Single,
    /// Every variant of every module
    All,
    /// Native build information for selected variants only
    Native,
}

impl SyncMode {
    fn default_options(self) -> SyncOptions {
        match self {
            SyncMode::Single => SyncOptions::default(),
            SyncMode::All => SyncOptions::AllVariants(AllVariantsSyncOptions::default()),
            SyncMode::Native => SyncOptions::NativeVariants(NativeVariantsSyncOptions::default()),
        }
    }
}

/// Sync command options
pub struct SyncCommand {
    pub fixture_path: PathBuf,
    pub mode: SyncMode,
    /// JSON file with full sync options; overrides `mode`
    pub options_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

impl SyncCommand {
    /// Execute the sync command
    pub async fn execute(&self) -> Result<Vec<Delivery>> {
        let config = match &self.config_path {
            Some(path) => AppConfig::load_from(path).await,
            None => AppConfig::load().await,
        }
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

        let options = match &self.options_path {
            Some(path) => {
                let contents = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read sync options {:?}", path))?;
                serde_json::from_str(&contents).with_context(|| format!("Malformed sync options {:?}", path))?
            }
            None => self.mode.default_options(),
        };

        let contents = tokio::fs::read_to_string(&self.fixture_path)
            .await
            .with_context(|| format!("Failed to read build fixture {:?}", self.fixture_path))?;
        let controller = FixtureController::from_json(&contents)
            .with_context(|| format!("Malformed build fixture {:?}", self.fixture_path))?;

        info!("Syncing {:?}", self.fixture_path);
        // The pass blocks on model requests
        let deliveries = tokio::task::spawn_blocking(move || {
            let builds = controller.builds().to_vec();
            let worker = ModelProviderWorker::new(&controller, &config, options, builds);
            let mut deliveries = Vec::new();
            worker.populate_build_models(&mut deliveries);
            deliveries
        })
        .await?;

        for delivery in &deliveries {
            if let DeliveredModel::SyncError(error) = &delivery.model {
                warn!("Sync failed: {}", error.message);
            }
        }
        Ok(deliveries)
    }
}

/// Pretty JSON rendering of the delivered models
pub fn render(deliveries: &[Delivery]) -> Result<String> {
    Ok(serde_json::to_string_pretty(deliveries)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "builds": [{
            "name": "notes",
            "root_dir": "/work/notes",
            "projects": [{ "name": "app", "build_root": "/work/notes", "project_path": ":app" }]
        }],
        "idea_project": { "name": "notes" },
        "projects": {
            "/work/notes:app": {
                "android_project": {
                    "name": "app",
                    "model_version": "4.2.2",
                    "project_type": "app",
                    "variant_names": ["debug", "release"]
                },
                "variants": {
                    "debug": { "name": "debug", "build_type": "debug", "main_artifact": {} },
                    "release": { "name": "release", "build_type": "release", "main_artifact": {} }
                }
            }
        }
    }"#;

    async fn command(dir: &tempfile::TempDir, fixture: &str, mode: SyncMode) -> SyncCommand {
        let fixture_path = dir.path().join("build.json");
        let config_path = dir.path().join("sync.toml");
        tokio::fs::write(&fixture_path, fixture).await.unwrap();
        tokio::fs::write(&config_path, "[sync]\nparallel_threads = 2\n").await.unwrap();
        SyncCommand { fixture_path, mode, options_path: None, config_path: Some(config_path) }
    }

    #[tokio::test]
    async fn test_sync_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let deliveries = command(&dir, FIXTURE, SyncMode::Single).await.execute().await.unwrap();

        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].model.model_name(), "IdeaProject");
        let DeliveredModel::AndroidModule(app) = &deliveries[1].model else { panic!("expected the app module") };
        assert_eq!(app.synced_variant.as_ref().map(|v| v.name.as_str()), Some("debug"));

        let json = render(&deliveries).unwrap();
        assert!(json.contains("\"model\": \"android_module\""));
    }

    #[tokio::test]
    async fn test_options_file_overrides_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut command = command(&dir, FIXTURE, SyncMode::Single).await;
        let options_path = dir.path().join("options.json");
        tokio::fs::write(&options_path, r#"{ "mode": "all_variants" }"#).await.unwrap();
        command.options_path = Some(options_path);

        let deliveries = command.execute().await.unwrap();
        let DeliveredModel::AndroidModule(app) = &deliveries[1].model else { panic!("expected the app module") };
        assert!(app.synced_variant.is_none());
        assert_eq!(app.all_variants.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_malformed_fixture_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = command(&dir, "{ not json", SyncMode::All).await.execute().await.unwrap_err();
        assert!(err.to_string().contains("Malformed build fixture"));
    }
}
