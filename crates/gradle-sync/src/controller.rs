//! Build Controller
//!
//! The narrow interface to the build-tool's tooling API. A request names
//! the model to build and its builder parameters; the controller answers
//! with the model, `None` when the build has no such model, or an error.

use std::path::Path;
use tracing::debug;

use crate::error::{ControllerError, Result, SyncError};
use crate::protocol::{
    v1, v2, AdditionalClassifierArtifactsModel, BuildMap, IdeaProject, KaptGradleModel,
    KotlinGradleModel, ProjectIdentifier,
};

/// What a model request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// The whole build session (root IDE project)
    Session,
    /// The root project of a build
    Build(&'a Path),
    Project(&'a ProjectIdentifier),
}

impl std::fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Session => write!(f, "<session>"),
            Target::Build(root) => write!(f, "build {}", root.display()),
            Target::Project(id) => write!(f, "{}", id.module_id()),
        }
    }
}

/// A model class together with its builder parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRequest {
    IdeaProject,
    BuildMap,
    // V2
    Versions,
    BasicAndroidProject,
    V2AndroidProject,
    AndroidDsl,
    VariantDependencies { variant: String },
    V2ProjectSyncIssues,
    /// `None` lists request every variant/ABI
    NativeModule {
        variants: Option<Vec<String>>,
        abis: Option<Vec<String>>,
    },
    // V1
    /// `should_build_variant: None` is the unparameterized request
    AndroidProject { should_build_variant: Option<bool> },
    NativeAndroidProject { should_build_variant: Option<bool> },
    Variant { variant: String },
    NativeVariantAbi { variant: String, abi: String },
    ProjectSyncIssues,
    // Kotlin
    KotlinMppModel,
    /// `source_sets: None` is the unparameterized request
    KotlinGradleModel { source_sets: Option<Vec<String>> },
    KaptGradleModel { source_sets: Option<Vec<String>> },
    AdditionalClassifierArtifacts {
        coordinates: Vec<String>,
        download_samples: bool,
    },
}

impl ModelRequest {
    pub fn model_name(&self) -> &'static str {
        match self {
            ModelRequest::IdeaProject => "IdeaProject",
            ModelRequest::BuildMap => "BuildMap",
            ModelRequest::Versions => "Versions",
            ModelRequest::BasicAndroidProject => "BasicAndroidProject",
            ModelRequest::V2AndroidProject => "AndroidProject(v2)",
            ModelRequest::AndroidDsl => "AndroidDsl",
            ModelRequest::VariantDependencies { .. } => "VariantDependencies",
            ModelRequest::V2ProjectSyncIssues => "ProjectSyncIssues(v2)",
            ModelRequest::NativeModule { .. } => "NativeModule",
            ModelRequest::AndroidProject { .. } => "AndroidProject",
            ModelRequest::NativeAndroidProject { .. } => "NativeAndroidProject",
            ModelRequest::Variant { .. } => "Variant",
            ModelRequest::NativeVariantAbi { .. } => "NativeVariantAbi",
            ModelRequest::ProjectSyncIssues => "ProjectSyncIssues",
            ModelRequest::KotlinMppModel => "KotlinMPPGradleModel",
            ModelRequest::KotlinGradleModel { .. } => "KotlinGradleModel",
            ModelRequest::KaptGradleModel { .. } => "KaptGradleModel",
            ModelRequest::AdditionalClassifierArtifacts { .. } => "AdditionalClassifierArtifactsModel",
        }
    }
}

/// Any model the controller can answer with
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    IdeaProject(IdeaProject),
    BuildMap(BuildMap),
    Versions(v2::Versions),
    BasicAndroidProject(v2::BasicAndroidProject),
    V2AndroidProject(v2::AndroidProject),
    AndroidDsl(v2::AndroidDsl),
    VariantDependencies(v2::VariantDependencies),
    V2ProjectSyncIssues(v2::ProjectSyncIssues),
    NativeModule(v2::NativeModule),
    AndroidProject(v1::AndroidProject),
    NativeAndroidProject(v1::NativeAndroidProject),
    Variant(v1::Variant),
    NativeVariantAbi(v1::NativeVariantAbi),
    ProjectSyncIssues(v1::ProjectSyncIssues),
    /// Marker model; only its presence matters
    KotlinMppModel,
    KotlinGradleModel(KotlinGradleModel),
    KaptGradleModel(KaptGradleModel),
    AdditionalClassifierArtifacts(AdditionalClassifierArtifactsModel),
}

/// Connection to the build tool. Shared by concurrently running fetch
/// actions, so implementations must be thread safe.
pub trait BuildController: Send + Sync {
    fn find_model(&self, target: Target<'_>, request: &ModelRequest) -> std::result::Result<Option<Model>, ControllerError>;
}

macro_rules! typed_fetch {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        fn $name(&self, target: Target<'_>, request: &ModelRequest) -> Result<Option<$ty>> {
            match self.find_or_default(target, request)? {
                Some(Model::$variant(model)) => Ok(Some(model)),
                Some(other) => Err(unexpected_model(target, request, &other)),
                None => Ok(None),
            }
        }
    };
}

fn unexpected_model(target: Target<'_>, request: &ModelRequest, _model: &Model) -> SyncError {
    SyncError::InvalidModel(format!(
        "{} requested for {} but the build answered with a different model",
        request.model_name(),
        target,
    ))
}

/// Typed requests layered over [`BuildController::find_model`]
pub trait ControllerExt: BuildController {
    /// Request a model, degrading an unsupported request to `None`
    fn find_or_default(&self, target: Target<'_>, request: &ModelRequest) -> Result<Option<Model>> {
        match self.find_model(target, request) {
            Ok(model) => Ok(model),
            Err(ControllerError::UnsupportedVersion(reason)) => {
                debug!("{} unsupported for {}: {}", request.model_name(), target, reason);
                Ok(None)
            }
            Err(source) => Err(SyncError::ModelFetch {
                model: request.model_name(),
                target: target.to_string(),
                source,
            }),
        }
    }

    typed_fetch!(find_idea_project, IdeaProject, IdeaProject);
    typed_fetch!(find_build_map, BuildMap, BuildMap);
    typed_fetch!(find_versions, Versions, v2::Versions);
    typed_fetch!(find_basic_android_project, BasicAndroidProject, v2::BasicAndroidProject);
    typed_fetch!(find_v2_android_project, V2AndroidProject, v2::AndroidProject);
    typed_fetch!(find_android_dsl, AndroidDsl, v2::AndroidDsl);
    typed_fetch!(find_variant_dependencies, VariantDependencies, v2::VariantDependencies);
    typed_fetch!(find_v2_sync_issues, V2ProjectSyncIssues, v2::ProjectSyncIssues);
    typed_fetch!(find_native_module, NativeModule, v2::NativeModule);
    typed_fetch!(find_v1_android_project, AndroidProject, v1::AndroidProject);
    typed_fetch!(find_native_android_project, NativeAndroidProject, v1::NativeAndroidProject);
    typed_fetch!(find_v1_variant, Variant, v1::Variant);
    typed_fetch!(find_native_variant_abi, NativeVariantAbi, v1::NativeVariantAbi);
    typed_fetch!(find_v1_sync_issues, ProjectSyncIssues, v1::ProjectSyncIssues);
    typed_fetch!(find_kotlin_gradle_model, KotlinGradleModel, KotlinGradleModel);
    typed_fetch!(find_kapt_gradle_model, KaptGradleModel, KaptGradleModel);
    typed_fetch!(find_additional_classifier_artifacts, AdditionalClassifierArtifacts, AdditionalClassifierArtifactsModel);

    fn is_kotlin_mpp_project(&self, project: &ProjectIdentifier) -> Result<bool> {
        Ok(self.find_or_default(Target::Project(project), &ModelRequest::KotlinMppModel)?.is_some())
    }

    /// V1 `AndroidProject` without variant payload. Falls back to the
    /// plain request when the build tool rejects the parameter.
    fn find_parameterized_android_project(&self, project: &ProjectIdentifier) -> Result<Option<v1::AndroidProject>> {
        let target = Target::Project(project);
        let parameterized = ModelRequest::AndroidProject { should_build_variant: Some(false) };
        if let Some(model) = self.find_or_default(target, &parameterized)? {
            return match model {
                Model::AndroidProject(model) => Ok(Some(model)),
                other => Err(unexpected_model(target, &parameterized, &other)),
            };
        }
        self.find_v1_android_project(target, &ModelRequest::AndroidProject { should_build_variant: None })
    }

    fn find_parameterized_native_android_project(&self, project: &ProjectIdentifier) -> Result<Option<v1::NativeAndroidProject>> {
        let target = Target::Project(project);
        let parameterized = ModelRequest::NativeAndroidProject { should_build_variant: Some(false) };
        if let Some(model) = self.find_or_default(target, &parameterized)? {
            return match model {
                Model::NativeAndroidProject(model) => Ok(Some(model)),
                other => Err(unexpected_model(target, &parameterized, &other)),
            };
        }
        self.find_native_android_project(target, &ModelRequest::NativeAndroidProject { should_build_variant: None })
    }

    /// Basic V2 native module; with `sync_all_variants_and_abis` every
    /// variant and ABI gets build information generated.
    fn find_native_module_basic(&self, project: &ProjectIdentifier, sync_all_variants_and_abis: bool) -> Result<Option<v2::NativeModule>> {
        let request = if sync_all_variants_and_abis {
            ModelRequest::NativeModule { variants: None, abis: None }
        } else {
            ModelRequest::NativeModule { variants: Some(Vec::new()), abis: Some(Vec::new()) }
        };
        self.find_native_module(Target::Project(project), &request)
    }
}

impl<T: BuildController + ?Sized> ControllerExt for T {}

/// Source set names Kotlin models are computed for, for one variant
pub fn android_source_sets(variant_name: &str) -> Vec<String> {
    ["", "unitTest", "androidTest"]
        .iter()
        .map(|suffix| append_capitalized(variant_name, suffix))
        .collect()
}

/// `append_capitalized("free", "debug") == "freeDebug"`
pub fn append_capitalized(prefix: &str, suffix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + suffix.len());
    out.push_str(prefix);
    let mut chars = suffix.chars();
    if let Some(first) = chars.next() {
        if prefix.is_empty() {
            out.push(first);
        } else {
            out.extend(first.to_uppercase());
        }
        out.push_str(chars.as_str());
    }
    out
}

/// Kotlin model request for one Android module variant. Kotlin MPP
/// projects are requested unparameterized since their source sets are
/// not known in advance.
pub fn fetch_kotlin_models(
    controller: &dyn BuildController,
    project: &ProjectIdentifier,
    source_sets: Vec<String>,
) -> Result<(Option<KotlinGradleModel>, Option<KaptGradleModel>)> {
    let target = Target::Project(project);
    let source_sets = if controller.is_kotlin_mpp_project(project)? { None } else { Some(source_sets) };
    let kotlin = controller.find_kotlin_gradle_model(target, &ModelRequest::KotlinGradleModel { source_sets: source_sets.clone() })?;
    let kapt = controller.find_kapt_gradle_model(target, &ModelRequest::KaptGradleModel { source_sets })?;
    Ok((kotlin, kapt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_capitalized() {
        assert_eq!(append_capitalized("free", "debug"), "freeDebug");
        assert_eq!(append_capitalized("debug", ""), "debug");
        assert_eq!(append_capitalized("", "debug"), "debug");
    }

    #[test]
    fn test_android_source_sets() {
        assert_eq!(
            android_source_sets("fullDebug"),
            vec!["fullDebug".to_string(), "fullDebugUnitTest".into(), "fullDebugAndroidTest".into()]
        );
    }
}
