//! Additional classifier artifacts
//!
//! Sources, javadoc and sample jars of the libraries the resolved
//! variants use. Requested after variant resolution because the library
//! list only exists once the variants are known.

use std::collections::BTreeSet;

use tracing::debug;

use crate::controller::{ControllerExt, ModelRequest, Target};
use crate::error::Result;
use crate::model::IdeVariant;
use crate::options::AdditionalClassifierArtifactsOptions;
use crate::protocol::{AdditionalClassifierArtifactsModel, ProjectIdentifier};
use crate::runner::{action, ActionRunner, FetchAction};

/// Library coordinates of `variants` not yet known to the IDE
pub fn library_coordinates<'v>(
    variants: impl IntoIterator<Item = &'v IdeVariant>,
    options: &AdditionalClassifierArtifactsOptions,
) -> Vec<String> {
    variants
        .into_iter()
        .flat_map(|variant| variant.libraries())
        .map(|library| library.artifact_address.clone())
        .filter(|address| !options.cached_libraries.contains(address))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One request per module with uncached libraries; `None` for the rest
pub fn fetch_additional_classifier_artifacts(
    runner: &ActionRunner<'_>,
    modules: &[(&ProjectIdentifier, Vec<String>)],
    options: &AdditionalClassifierArtifactsOptions,
) -> Result<Vec<Option<AdditionalClassifierArtifactsModel>>> {
    let download_samples = options.download_androidx_ui_samples_sources;
    let actions: Vec<FetchAction<'_, Option<AdditionalClassifierArtifactsModel>>> = modules
        .iter()
        .map(|(project, coordinates)| {
            let project = *project;
            let coordinates = coordinates.clone();
            action(move |controller| {
                if coordinates.is_empty() {
                    return Ok(None);
                }
                debug!("Requesting classifier artifacts of {} libraries for {}", coordinates.len(), project.module_id());
                let request = ModelRequest::AdditionalClassifierArtifacts { coordinates, download_samples };
                controller.find_additional_classifier_artifacts(Target::Project(project), &request)
            })
        })
        .collect();
    runner.run_actions(actions)
}
