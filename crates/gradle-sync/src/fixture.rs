//! Fixture build controller
//!
//! An in-memory build described as JSON. Answers model requests from
//! per-project model tables, can pretend to be an older build tool by
//! rejecting requests as unsupported, and records every request it
//! receives.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::controller::{BuildController, Model, ModelRequest, Target};
use crate::error::ControllerError;
use crate::protocol::{
    v1, v2, AdditionalClassifierArtifactsModel, BuildMap, GradleBuild, IdeaProject, KaptGradleModel,
    KotlinGradleModel, ProjectIdentifier,
};

/// Models of one Gradle project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureProject {
    pub versions: Option<v2::Versions>,
    pub basic_android_project: Option<v2::BasicAndroidProject>,
    pub v2_android_project: Option<v2::AndroidProject>,
    pub android_dsl: Option<v2::AndroidDsl>,
    pub variant_dependencies: BTreeMap<String, v2::VariantDependencies>,
    pub v2_sync_issues: Option<v2::ProjectSyncIssues>,
    pub native_module: Option<v2::NativeModule>,

    pub android_project: Option<v1::AndroidProject>,
    pub native_android_project: Option<v1::NativeAndroidProject>,
    pub variants: BTreeMap<String, v1::Variant>,
    pub native_variant_abis: Vec<v1::NativeVariantAbi>,
    pub sync_issues: Option<v1::ProjectSyncIssues>,
    /// Build tool too old for builder parameters on V1 requests
    pub rejects_builder_parameters: bool,

    pub kotlin_mpp: bool,
    pub kotlin_gradle_model: Option<KotlinGradleModel>,
    pub kapt_gradle_model: Option<KaptGradleModel>,
    pub additional_classifier_artifacts: Option<AdditionalClassifierArtifactsModel>,

    /// Model names answered with `UnsupportedVersion`
    pub unsupported: BTreeSet<String>,
    /// Model name to failure message
    pub failures: BTreeMap<String, String>,
}

/// Whole fixture build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildFixture {
    pub builds: Vec<GradleBuild>,
    pub idea_project: Option<IdeaProject>,
    /// Build map per build root
    pub build_maps: BTreeMap<PathBuf, BuildMap>,
    /// Projects by module id
    pub projects: BTreeMap<String, FixtureProject>,
    /// Simulated round-trip time of every request
    pub latency_ms: u64,
}

/// Request as seen by the controller: target and request
pub type RecordedRequest = (String, ModelRequest);

#[derive(Debug, Default)]
pub struct FixtureController {
    fixture: BuildFixture,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FixtureController {
    pub fn new(fixture: BuildFixture) -> Self {
        Self { fixture, requests: Mutex::new(Vec::new()) }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn builds(&self) -> &[GradleBuild] {
        &self.fixture.builds
    }

    pub fn project_mut(&mut self, project: &ProjectIdentifier) -> &mut FixtureProject {
        self.fixture.projects.entry(project.module_id()).or_default()
    }

    pub fn add_variant(&mut self, project: &ProjectIdentifier, variant: v1::Variant) {
        self.project_mut(project).variants.insert(variant.name.clone(), variant);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, model_name: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|(_, request)| request.model_name() == model_name)
            .cloned()
            .collect()
    }

    fn project_model(&self, project: &FixtureProject, request: &ModelRequest) -> Result<Option<Model>, ControllerError> {
        let name = request.model_name();
        if project.unsupported.contains(name) {
            return Err(ControllerError::UnsupportedVersion(format!("{} is not available", name)));
        }
        if let Some(message) = project.failures.get(name) {
            return Err(ControllerError::Failed(message.clone()));
        }

        Ok(match request {
            ModelRequest::Versions => project.versions.clone().map(Model::Versions),
            ModelRequest::BasicAndroidProject => project.basic_android_project.clone().map(Model::BasicAndroidProject),
            ModelRequest::V2AndroidProject => project.v2_android_project.clone().map(Model::V2AndroidProject),
            ModelRequest::AndroidDsl => project.android_dsl.clone().map(Model::AndroidDsl),
            ModelRequest::VariantDependencies { variant } => {
                project.variant_dependencies.get(variant).cloned().map(Model::VariantDependencies)
            }
            ModelRequest::V2ProjectSyncIssues => project.v2_sync_issues.clone().map(Model::V2ProjectSyncIssues),
            ModelRequest::NativeModule { .. } => project.native_module.clone().map(Model::NativeModule),
            ModelRequest::AndroidProject { should_build_variant } => {
                if should_build_variant.is_some() && project.rejects_builder_parameters {
                    return Err(ControllerError::UnsupportedVersion("builder parameters".into()));
                }
                project.android_project.clone().map(Model::AndroidProject)
            }
            ModelRequest::NativeAndroidProject { should_build_variant } => {
                if should_build_variant.is_some() && project.rejects_builder_parameters {
                    return Err(ControllerError::UnsupportedVersion("builder parameters".into()));
                }
                project.native_android_project.clone().map(Model::NativeAndroidProject)
            }
            ModelRequest::Variant { variant } => project.variants.get(variant).cloned().map(Model::Variant),
            ModelRequest::NativeVariantAbi { variant, abi } => project
                .native_variant_abis
                .iter()
                .find(|m| &m.variant_name == variant && &m.abi == abi)
                .cloned()
                .map(Model::NativeVariantAbi),
            ModelRequest::ProjectSyncIssues => project.sync_issues.clone().map(Model::ProjectSyncIssues),
            ModelRequest::KotlinMppModel => project.kotlin_mpp.then_some(Model::KotlinMppModel),
            ModelRequest::KotlinGradleModel { .. } => project.kotlin_gradle_model.clone().map(Model::KotlinGradleModel),
            ModelRequest::KaptGradleModel { .. } => project.kapt_gradle_model.clone().map(Model::KaptGradleModel),
            ModelRequest::AdditionalClassifierArtifacts { .. } => {
                project.additional_classifier_artifacts.clone().map(Model::AdditionalClassifierArtifacts)
            }
            ModelRequest::IdeaProject | ModelRequest::BuildMap => None,
        })
    }
}

impl BuildController for FixtureController {
    fn find_model(&self, target: Target<'_>, request: &ModelRequest) -> Result<Option<Model>, ControllerError> {
        trace!("{} <- {:?}", target, request);
        self.requests.lock().push((target.to_string(), request.clone()));
        if self.fixture.latency_ms > 0 {
            thread::sleep(Duration::from_millis(self.fixture.latency_ms));
        }

        match (target, request) {
            (Target::Session, ModelRequest::IdeaProject) => Ok(self.fixture.idea_project.clone().map(Model::IdeaProject)),
            (Target::Build(root), ModelRequest::BuildMap) => Ok(self.fixture.build_maps.get(root).cloned().map(Model::BuildMap)),
            (Target::Project(project), request) => match self.fixture.projects.get(&project.module_id()) {
                Some(models) => self.project_model(models, request),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }
}
