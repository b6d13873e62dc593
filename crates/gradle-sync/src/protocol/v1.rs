//! Legacy (V1) builder model

use std::collections::BTreeMap;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use super::AndroidProjectType;

/// Sync issue as reported by the V1 model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncIssue {
    pub severity: i32,
    #[serde(rename = "type")]
    pub issue_type: i32,
    #[serde(default)]
    pub data: Option<String>,
    pub message: String,
    /// Missing on plugins that predate multi-line messages
    #[serde(default)]
    pub multi_line_message: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFlavor {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<String>,
}

/// Base V1 project model. Fetched with `shouldBuildVariant = false`
/// so that it carries no variant payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidProject {
    pub name: String,
    /// Plugin version that produced the model
    #[serde(default)]
    pub model_version: Option<String>,
    pub project_type: AndroidProjectType,
    #[serde(default)]
    pub variant_names: Option<Vec<String>>,
    #[serde(default)]
    pub default_variant: Option<String>,
    #[serde(default)]
    pub flavor_dimensions: Vec<String>,
    #[serde(default)]
    pub build_types: Vec<String>,
    #[serde(default)]
    pub product_flavors: Vec<ProductFlavor>,
    #[serde(default)]
    pub dynamic_features: Vec<String>,
    #[serde(default)]
    pub sync_issues: Option<Vec<SyncIssue>>,
    #[serde(default)]
    pub ndk_version: Option<String>,
}

/// Edge to another Gradle project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDependency {
    /// Build root directory of the dependency, absent for the main build
    #[serde(default)]
    pub build_id: Option<String>,
    pub project_path: String,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    Android,
    Java,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDependency {
    pub artifact_address: String,
    pub kind: LibraryKind,
    #[serde(default)]
    pub artifact: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedDependency {
    pub name: String,
    #[serde(default)]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub module_dependencies: Vec<ProjectDependency>,
    #[serde(default)]
    pub libraries: Vec<LibraryDependency>,
    #[serde(default)]
    pub unresolved_dependencies: Vec<UnresolvedDependency>,
}

/// Variant model, fetched one variant at a time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub product_flavors: Vec<String>,
    pub main_artifact: Artifact,
    #[serde(default)]
    pub unit_test_artifact: Option<Artifact>,
    #[serde(default)]
    pub android_test_artifact: Option<Artifact>,
    #[serde(default)]
    pub test_fixtures_artifact: Option<Artifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeVariantInfo {
    #[serde(default)]
    pub abi_names: Vec<String>,
}

/// Native build description of all variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAndroidProject {
    pub name: String,
    #[serde(default)]
    pub variant_infos: BTreeMap<String, NativeVariantInfo>,
    #[serde(default)]
    pub ndk_version: Option<String>,
}

/// Native build information for one variant and ABI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeVariantAbi {
    pub variant_name: String,
    pub abi: String,
    #[serde(default)]
    pub build_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSyncIssues {
    #[serde(default)]
    pub sync_issues: Vec<SyncIssue>,
}
