//! IDE Model
//!
//! Protocol-independent, immutable representation of the imported
//! project. Produced by [`ModelCache`](crate::ModelCache) from either
//! protocol version.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::protocol::AndroidProjectType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeProductFlavor {
    pub name: String,
    pub dimension: Option<String>,
}

/// Base Android project of a module, without variant payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeAndroidProject {
    pub name: String,
    pub project_type: AndroidProjectType,
    pub agp_version: String,
    pub namespace: Option<String>,
    pub flavor_dimensions: Vec<String>,
    pub build_types: Vec<String>,
    pub product_flavors: Vec<IdeProductFlavor>,
    /// Gradle paths of dynamic feature modules
    pub dynamic_features: Vec<String>,
    pub ndk_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeLibraryKind {
    Android,
    Java,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdeLibrary {
    pub artifact_address: String,
    pub kind: IdeLibraryKind,
    pub artifact: Option<PathBuf>,
}

/// Edge from an artifact to another module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdeModuleDependency {
    /// Build root directory, `None` for the main build
    pub build_id: Option<String>,
    pub project_path: String,
    /// Variant of the target module, when the build told us
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdeUnresolvedDependency {
    pub name: String,
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeArtifact {
    pub libraries: Vec<Arc<IdeLibrary>>,
    pub module_dependencies: Vec<IdeModuleDependency>,
    pub unresolved_dependencies: Vec<IdeUnresolvedDependency>,
}

/// One fully resolved variant of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeVariant {
    pub name: String,
    pub display_name: String,
    pub build_type: Option<String>,
    /// Flavors in flavor-dimension order
    pub product_flavors: Vec<String>,
    pub main_artifact: IdeArtifact,
    pub unit_test_artifact: Option<IdeArtifact>,
    pub android_test_artifact: Option<IdeArtifact>,
    pub test_fixtures_artifact: Option<IdeArtifact>,
}

impl IdeVariant {
    pub fn artifacts(&self) -> impl Iterator<Item = &IdeArtifact> {
        std::iter::once(&self.main_artifact)
            .chain(self.unit_test_artifact.iter())
            .chain(self.android_test_artifact.iter())
            .chain(self.test_fixtures_artifact.iter())
    }

    /// Module edges of every artifact, main artifact first
    pub fn module_dependencies(&self) -> impl Iterator<Item = &IdeModuleDependency> {
        self.artifacts().flat_map(|a| a.module_dependencies.iter())
    }

    pub fn unresolved_dependencies(&self) -> Vec<IdeUnresolvedDependency> {
        self.artifacts()
            .flat_map(|a| a.unresolved_dependencies.iter().cloned())
            .collect()
    }

    pub fn libraries(&self) -> impl Iterator<Item = &Arc<IdeLibrary>> {
        self.artifacts().flat_map(|a| a.libraries.iter())
    }
}

/// Variant header known from the base project model, before its
/// dependencies are fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeVariantCore {
    pub name: String,
    pub display_name: String,
    pub build_type: Option<String>,
    pub product_flavors: Vec<String>,
    pub has_unit_test: bool,
    pub has_android_test: bool,
    pub has_test_fixtures: bool,
}

pub const SEVERITY_WARNING: i32 = 1;
pub const SEVERITY_ERROR: i32 = 2;
pub const TYPE_UNRESOLVED_DEPENDENCY: i32 = 6;
pub const TYPE_EXTERNAL_NATIVE_BUILD_CONFIGURATION: i32 = 21;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeSyncIssue {
    pub message: String,
    pub data: Option<String>,
    pub multi_line_message: Option<Vec<String>>,
    pub severity: i32,
    pub issue_type: i32,
}

impl IdeSyncIssue {
    pub fn unresolved_dependency(dependency: &IdeUnresolvedDependency) -> Self {
        Self {
            message: "Unresolved dependencies".to_string(),
            data: Some(dependency.name.clone()),
            multi_line_message: dependency
                .cause
                .as_ref()
                .map(|cause| cause.lines().map(str::to_string).collect()),
            severity: SEVERITY_ERROR,
            issue_type: TYPE_UNRESOLVED_DEPENDENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeNativeAndroidProject {
    pub name: String,
    /// ABI names per variant
    pub variant_abis: BTreeMap<String, Vec<String>>,
    pub ndk_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeNativeModule {
    pub name: String,
    /// ABI names per variant
    pub variant_abis: BTreeMap<String, Vec<String>>,
    pub ndk_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeNativeVariantAbi {
    pub variant_name: String,
    pub abi: String,
    pub build_files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(project_path: &str, unresolved: &[&str]) -> IdeArtifact {
        IdeArtifact {
            libraries: Vec::new(),
            module_dependencies: vec![IdeModuleDependency {
                build_id: None,
                project_path: project_path.to_string(),
                variant: None,
            }],
            unresolved_dependencies: unresolved
                .iter()
                .map(|name| IdeUnresolvedDependency { name: name.to_string(), cause: None })
                .collect(),
        }
    }

    #[test]
    fn test_variant_collects_all_artifacts() {
        let variant = IdeVariant {
            name: "debug".into(),
            display_name: "debug".into(),
            build_type: Some("debug".into()),
            product_flavors: Vec::new(),
            main_artifact: artifact(":lib", &["com.example:missing:1.0"]),
            unit_test_artifact: Some(artifact(":testing", &[])),
            android_test_artifact: None,
            test_fixtures_artifact: Some(artifact(":fixtures", &["junit:junit:99"])),
        };

        let paths: Vec<_> = variant.module_dependencies().map(|d| d.project_path.as_str()).collect();
        assert_eq!(paths, vec![":lib", ":testing", ":fixtures"]);
        assert_eq!(variant.unresolved_dependencies().len(), 2);
    }

    #[test]
    fn test_unresolved_issue_splits_cause_lines() {
        let issue = IdeSyncIssue::unresolved_dependency(&IdeUnresolvedDependency {
            name: "com.example:missing:1.0".into(),
            cause: Some("Could not find artifact\nSearched in: google()".into()),
        });
        assert_eq!(issue.severity, SEVERITY_ERROR);
        assert_eq!(issue.issue_type, TYPE_UNRESOLVED_DEPENDENCY);
        assert_eq!(issue.multi_line_message.map(|m| m.len()), Some(2));
    }
}
