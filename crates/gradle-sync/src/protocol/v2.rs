//! Split (V2) builder model

use std::collections::BTreeMap;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use super::AndroidProjectType;
use super::v1::{LibraryKind, UnresolvedDependency};

/// Version handshake model. Requested first to decide whether V2 is usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub agp: String,
    #[serde(default)]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicVariant {
    pub name: String,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub product_flavors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAndroidProject {
    pub build_name: String,
    pub project_type: AndroidProjectType,
    #[serde(default)]
    pub variants: Vec<BasicVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub has_unit_test: bool,
    #[serde(default)]
    pub has_android_test: bool,
    #[serde(default)]
    pub has_test_fixtures: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidProject {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub dynamic_features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTypeDsl {
    pub name: String,
    #[serde(default)]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFlavorDsl {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidDsl {
    #[serde(default)]
    pub flavor_dimensions: Vec<String>,
    #[serde(default)]
    pub build_types: Vec<BuildTypeDsl>,
    #[serde(default)]
    pub product_flavors: Vec<ProductFlavorDsl>,
    #[serde(default)]
    pub ndk_version: Option<String>,
}

/// Attributes identifying the variant a project dependency resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Build *name*, translated through the build map
    pub build_id: String,
    pub project_path: String,
    #[serde(default)]
    pub build_type: Option<String>,
    /// Flavor per dimension
    #[serde(default)]
    pub product_flavors: BTreeMap<String, String>,
    #[serde(default)]
    pub is_test_fixtures: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Library {
    Project(ProjectInfo),
    External {
        artifact_address: String,
        kind: LibraryKind,
        #[serde(default)]
        artifact: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphItem {
    pub key: String,
    #[serde(default)]
    pub dependencies: Vec<GraphItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDependencies {
    #[serde(default)]
    pub compile_dependencies: Vec<GraphItem>,
    #[serde(default)]
    pub unresolved_dependencies: Vec<UnresolvedDependency>,
}

/// Dependencies of one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDependencies {
    pub name: String,
    pub main_artifact: ArtifactDependencies,
    #[serde(default)]
    pub unit_test_artifact: Option<ArtifactDependencies>,
    #[serde(default)]
    pub android_test_artifact: Option<ArtifactDependencies>,
    #[serde(default)]
    pub test_fixtures_artifact: Option<ArtifactDependencies>,
    /// Library table keyed by graph item key
    #[serde(default)]
    pub libraries: BTreeMap<String, Library>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncIssue {
    pub severity: i32,
    #[serde(rename = "type")]
    pub issue_type: i32,
    #[serde(default)]
    pub data: Option<String>,
    pub message: String,
    #[serde(default)]
    pub multi_line_message: Option<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSyncIssues {
    #[serde(default)]
    pub sync_issues: Vec<SyncIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAbi {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeVariant {
    pub name: String,
    #[serde(default)]
    pub abis: Vec<NativeAbi>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeModule {
    pub name: String,
    #[serde(default)]
    pub variants: Vec<NativeVariant>,
    #[serde(default)]
    pub ndk_version: Option<String>,
}
