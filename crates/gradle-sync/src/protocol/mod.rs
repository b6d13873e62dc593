//! Build-tool Model Protocol
//!
//! Raw model objects as handed over by the build-tool's tooling API.
//! Two incompatible Android plugin protocols exist side by side:
//! [`v1`] (the legacy builder model) and [`v2`] (the split builder model
//! introduced with plugin 7.x). Getters that older plugins do not
//! implement are represented as `Option` fields.

pub mod v1;
pub mod v2;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Identity of one Gradle project inside a (possibly composite) build
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectIdentifier {
    /// Root directory of the build that owns the project
    pub build_root: PathBuf,
    /// Gradle path, e.g. `:app` or `:`
    pub project_path: String,
}

impl ProjectIdentifier {
    pub fn new(build_root: impl Into<PathBuf>, project_path: impl Into<String>) -> Self {
        Self {
            build_root: build_root.into(),
            project_path: project_path.into(),
        }
    }

    /// Stable module id used throughout one sync pass
    pub fn module_id(&self) -> String {
        module_id(&self.build_root, &self.project_path)
    }
}

/// Module id derived from (build root directory, project path)
pub fn module_id(build_root: &Path, project_path: &str) -> String {
    format!("{}{}", build_root.display(), project_path)
}

/// Project entry of a build, without any model attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicGradleProject {
    pub name: String,
    #[serde(flatten)]
    pub identifier: ProjectIdentifier,
}

impl BasicGradleProject {
    pub fn id(&self) -> String {
        self.identifier.module_id()
    }

    pub fn path(&self) -> &str {
        &self.identifier.project_path
    }

    pub fn build_root(&self) -> &Path {
        &self.identifier.build_root
    }
}

/// One (included) Gradle build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradleBuild {
    pub name: String,
    pub root_dir: PathBuf,
    pub projects: Vec<BasicGradleProject>,
}

/// Build name to build root directory map of a composite build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMap {
    #[serde(default)]
    pub build_id_map: BTreeMap<String, PathBuf>,
}

/// Root IDE project model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaProject {
    pub name: String,
    #[serde(default)]
    pub jdk_name: Option<String>,
    #[serde(default)]
    pub language_level: Option<String>,
}

/// Kind of Android project a module builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AndroidProjectType {
    App,
    Library,
    Test,
    DynamicFeature,
    InstantApp,
    Feature,
}

/// Kotlin plugin model of a module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KotlinGradleModel {
    #[serde(default)]
    pub has_kotlin_plugin: bool,
    #[serde(default)]
    pub kotlin_target: Option<String>,
    /// Source sets the model was computed for
    #[serde(default)]
    pub source_sets: Vec<String>,
}

/// Kapt annotation-processing model of a module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KaptGradleModel {
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub source_sets: Vec<String>,
}

/// Sources/javadoc/sample artifacts located for one library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierArtifacts {
    pub id: String,
    #[serde(default)]
    pub sources: Option<PathBuf>,
    #[serde(default)]
    pub javadoc: Option<PathBuf>,
    #[serde(default)]
    pub sample_sources: Option<PathBuf>,
}

/// Result of an additional classifier artifacts request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalClassifierArtifactsModel {
    #[serde(default)]
    pub artifacts: Vec<ClassifierArtifacts>,
    #[serde(default)]
    pub error_message: Option<String>,
}
