//! Model Cache
//!
//! Translates raw protocol models into the IDE model. Pure
//! transformation; the only state is an interning table so that a
//! library shared by many modules and variants is allocated once per
//! sync pass.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, SyncError};
use crate::model::{
    IdeAndroidProject, IdeArtifact, IdeLibrary, IdeLibraryKind, IdeModuleDependency,
    IdeNativeAndroidProject, IdeNativeModule, IdeNativeVariantAbi, IdeProductFlavor, IdeSyncIssue,
    IdeUnresolvedDependency, IdeVariant, IdeVariantCore,
};
use crate::protocol::{v1, v2};
use crate::resolver::VariantNameResolvers;

#[derive(Debug, Default)]
pub struct ModelCache {
    libraries: Mutex<HashMap<String, Arc<IdeLibrary>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct libraries seen so far
    pub fn library_count(&self) -> usize {
        self.libraries.lock().len()
    }

    fn library(&self, artifact_address: &str, kind: v1::LibraryKind, artifact: Option<&PathBuf>) -> Arc<IdeLibrary> {
        let mut libraries = self.libraries.lock();
        if let Some(existing) = libraries.get(artifact_address) {
            return Arc::clone(existing);
        }
        let library = Arc::new(IdeLibrary {
            artifact_address: artifact_address.to_string(),
            kind: match kind {
                v1::LibraryKind::Android => IdeLibraryKind::Android,
                v1::LibraryKind::Java => IdeLibraryKind::Java,
            },
            artifact: artifact.cloned(),
        });
        libraries.insert(artifact_address.to_string(), Arc::clone(&library));
        library
    }

    pub fn android_project_from_v1(&self, project: &v1::AndroidProject) -> IdeAndroidProject {
        IdeAndroidProject {
            name: project.name.clone(),
            project_type: project.project_type,
            agp_version: project.model_version.clone().unwrap_or_default(),
            namespace: None,
            flavor_dimensions: project.flavor_dimensions.clone(),
            build_types: project.build_types.clone(),
            product_flavors: project
                .product_flavors
                .iter()
                .map(|f| IdeProductFlavor { name: f.name.clone(), dimension: f.dimension.clone() })
                .collect(),
            dynamic_features: project.dynamic_features.clone(),
            ndk_version: project.ndk_version.clone(),
        }
    }

    pub fn android_project_from_v2(
        &self,
        basic: &v2::BasicAndroidProject,
        project: &v2::AndroidProject,
        versions: &v2::Versions,
        dsl: &v2::AndroidDsl,
    ) -> IdeAndroidProject {
        IdeAndroidProject {
            name: basic.build_name.clone(),
            project_type: basic.project_type,
            agp_version: versions.agp.clone(),
            namespace: project.namespace.clone(),
            flavor_dimensions: dsl.flavor_dimensions.clone(),
            build_types: dsl.build_types.iter().map(|b| b.name.clone()).collect(),
            product_flavors: dsl
                .product_flavors
                .iter()
                .map(|f| IdeProductFlavor { name: f.name.clone(), dimension: f.dimension.clone() })
                .collect(),
            dynamic_features: project.dynamic_features.clone(),
            ndk_version: dsl.ndk_version.clone(),
        }
    }

    pub fn variant_core_from_v2(&self, basic: &v2::BasicVariant, variant: &v2::Variant) -> IdeVariantCore {
        IdeVariantCore {
            name: variant.name.clone(),
            display_name: variant.display_name.clone().unwrap_or_else(|| variant.name.clone()),
            build_type: basic.build_type.clone(),
            product_flavors: basic.product_flavors.clone(),
            has_unit_test: variant.has_unit_test,
            has_android_test: variant.has_android_test,
            has_test_fixtures: variant.has_test_fixtures,
        }
    }

    pub fn variant_from_v1(&self, variant: &v1::Variant) -> IdeVariant {
        IdeVariant {
            name: variant.name.clone(),
            display_name: variant.display_name.clone().unwrap_or_else(|| variant.name.clone()),
            build_type: variant.build_type.clone(),
            product_flavors: variant.product_flavors.clone(),
            main_artifact: self.artifact_from_v1(&variant.main_artifact),
            unit_test_artifact: variant.unit_test_artifact.as_ref().map(|a| self.artifact_from_v1(a)),
            android_test_artifact: variant.android_test_artifact.as_ref().map(|a| self.artifact_from_v1(a)),
            test_fixtures_artifact: variant.test_fixtures_artifact.as_ref().map(|a| self.artifact_from_v1(a)),
        }
    }

    fn artifact_from_v1(&self, artifact: &v1::Artifact) -> IdeArtifact {
        IdeArtifact {
            libraries: artifact
                .libraries
                .iter()
                .map(|l| self.library(&l.artifact_address, l.kind, l.artifact.as_ref()))
                .collect(),
            module_dependencies: dedup(artifact.module_dependencies.iter().map(|d| IdeModuleDependency {
                build_id: d.build_id.clone(),
                project_path: d.project_path.clone(),
                variant: d.variant.clone(),
            })),
            unresolved_dependencies: unresolved_from(&artifact.unresolved_dependencies),
        }
    }

    /// Assembles a V2 variant from its header and its dependencies model.
    /// Project dependencies get their variant name from the target
    /// module's resolver.
    pub fn variant_from_v2(
        &self,
        core: &IdeVariantCore,
        dependencies: &v2::VariantDependencies,
        resolvers: &VariantNameResolvers,
    ) -> Result<IdeVariant> {
        let convert = |artifact: &v2::ArtifactDependencies| self.artifact_from_v2(artifact, &dependencies.libraries, resolvers);
        let optional = |artifact: &Option<v2::ArtifactDependencies>| artifact.as_ref().map(|a| convert(a)).transpose();

        Ok(IdeVariant {
            name: core.name.clone(),
            display_name: core.display_name.clone(),
            build_type: core.build_type.clone(),
            product_flavors: core.product_flavors.clone(),
            main_artifact: convert(&dependencies.main_artifact)?,
            unit_test_artifact: optional(&dependencies.unit_test_artifact)?,
            android_test_artifact: optional(&dependencies.android_test_artifact)?,
            test_fixtures_artifact: optional(&dependencies.test_fixtures_artifact)?,
        })
    }

    fn artifact_from_v2(
        &self,
        artifact: &v2::ArtifactDependencies,
        libraries: &BTreeMap<String, v2::Library>,
        resolvers: &VariantNameResolvers,
    ) -> Result<IdeArtifact> {
        let mut out = IdeArtifact {
            unresolved_dependencies: unresolved_from(&artifact.unresolved_dependencies),
            ..IdeArtifact::default()
        };

        // Transitive walk of the dependency graph, each key once
        let mut seen = HashSet::new();
        let mut stack: Vec<&v2::GraphItem> = artifact.compile_dependencies.iter().rev().collect();
        let mut module_dependencies = Vec::new();
        while let Some(item) = stack.pop() {
            if !seen.insert(item.key.as_str()) {
                continue;
            }
            stack.extend(item.dependencies.iter().rev());

            let library = libraries
                .get(&item.key)
                .ok_or_else(|| SyncError::InvalidModel(format!("Library '{}' missing from the library table", item.key)))?;
            match library {
                v2::Library::Project(info) => {
                    // An edge to a project outside this pass is reported, not fatal
                    let lookup = resolvers
                        .build_root(&info.build_id)
                        .and_then(|root| Ok((root, resolvers.get(root, &info.project_path)?)));
                    let (build_root, resolver) = match lookup {
                        Ok(found) => found,
                        Err(e) => {
                            debug!("Unresolvable project dependency {}: {}", item.key, e);
                            out.unresolved_dependencies.push(IdeUnresolvedDependency {
                                name: format!("{}{}", info.build_id, info.project_path),
                                cause: Some(e.to_string()),
                            });
                            continue;
                        }
                    };
                    let variant = resolver.resolve(info.build_type.as_deref(), &info.product_flavors);
                    trace!("{} -> {}{} resolved to {:?}", item.key, build_root.display(), info.project_path, variant);
                    module_dependencies.push(IdeModuleDependency {
                        build_id: Some(build_root.display().to_string()),
                        project_path: info.project_path.clone(),
                        variant,
                    });
                }
                v2::Library::External { artifact_address, kind, artifact } => {
                    out.libraries.push(self.library(artifact_address, *kind, artifact.as_ref()));
                }
            }
        }
        out.module_dependencies = dedup(module_dependencies.into_iter());
        Ok(out)
    }

    pub fn native_android_project_from(&self, project: &v1::NativeAndroidProject, ndk_version: Option<&str>) -> IdeNativeAndroidProject {
        IdeNativeAndroidProject {
            name: project.name.clone(),
            variant_abis: project
                .variant_infos
                .iter()
                .map(|(variant, info)| (variant.clone(), info.abi_names.clone()))
                .collect(),
            ndk_version: project.ndk_version.clone().or_else(|| ndk_version.map(str::to_string)),
        }
    }

    pub fn native_module_from(&self, module: &v2::NativeModule) -> IdeNativeModule {
        IdeNativeModule {
            name: module.name.clone(),
            variant_abis: module
                .variants
                .iter()
                .map(|v| (v.name.clone(), v.abis.iter().map(|a| a.name.clone()).collect()))
                .collect(),
            ndk_version: module.ndk_version.clone(),
        }
    }

    pub fn native_variant_abi_from(&self, model: &v1::NativeVariantAbi) -> IdeNativeVariantAbi {
        IdeNativeVariantAbi {
            variant_name: model.variant_name.clone(),
            abi: model.abi.clone(),
            build_files: model.build_files.clone(),
        }
    }

    pub fn sync_issues_from_v1(&self, issues: &[v1::SyncIssue]) -> Vec<IdeSyncIssue> {
        issues
            .iter()
            .map(|issue| IdeSyncIssue {
                message: issue.message.clone(),
                data: issue.data.clone(),
                multi_line_message: issue.multi_line_message.clone(),
                severity: issue.severity,
                issue_type: issue.issue_type,
            })
            .collect()
    }

    pub fn sync_issues_from_v2(&self, issues: &[v2::SyncIssue]) -> Vec<IdeSyncIssue> {
        issues
            .iter()
            .map(|issue| IdeSyncIssue {
                message: issue.message.clone(),
                data: issue.data.clone(),
                multi_line_message: issue
                    .multi_line_message
                    .as_ref()
                    .map(|lines| lines.iter().flatten().cloned().collect()),
                severity: issue.severity,
                issue_type: issue.issue_type,
            })
            .collect()
    }
}

fn unresolved_from(dependencies: &[v1::UnresolvedDependency]) -> Vec<IdeUnresolvedDependency> {
    dependencies
        .iter()
        .map(|d| IdeUnresolvedDependency { name: d.name.clone(), cause: d.cause.clone() })
        .collect()
}

fn dedup(dependencies: impl Iterator<Item = IdeModuleDependency>) -> Vec<IdeModuleDependency> {
    let mut seen = HashSet::new();
    dependencies.filter(|d| seen.insert(d.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ResolvableVariant, VariantNameResolver};

    fn external(address: &str) -> v2::Library {
        v2::Library::External { artifact_address: address.into(), kind: v1::LibraryKind::Java, artifact: None }
    }

    fn item(key: &str, children: Vec<v2::GraphItem>) -> v2::GraphItem {
        v2::GraphItem { key: key.into(), dependencies: children }
    }

    fn core(name: &str) -> IdeVariantCore {
        IdeVariantCore {
            name: name.into(),
            display_name: name.into(),
            build_type: Some("debug".into()),
            product_flavors: Vec::new(),
            has_unit_test: true,
            has_android_test: false,
            has_test_fixtures: false,
        }
    }

    fn resolvers() -> VariantNameResolvers {
        let mut resolvers = VariantNameResolvers::new(BTreeMap::from([(":".to_string(), PathBuf::from("/p"))]));
        resolvers.insert(
            PathBuf::from("/p"),
            ":lib".into(),
            VariantNameResolver::V2(vec![ResolvableVariant {
                name: "debug".into(),
                build_type: Some("debug".into()),
                flavors: BTreeMap::new(),
            }]),
        );
        resolvers
    }

    #[test]
    fn test_v2_variant_walks_graph_and_resolves_projects() {
        let cache = ModelCache::new();
        let dependencies = v2::VariantDependencies {
            name: "debug".into(),
            main_artifact: v2::ArtifactDependencies {
                compile_dependencies: vec![
                    item("lib", vec![item("guava", vec![])]),
                    item("guava", vec![]),
                ],
                unresolved_dependencies: Vec::new(),
            },
            unit_test_artifact: Some(v2::ArtifactDependencies::default()),
            android_test_artifact: None,
            test_fixtures_artifact: None,
            libraries: BTreeMap::from([
                (
                    "lib".to_string(),
                    v2::Library::Project(v2::ProjectInfo {
                        build_id: ":".into(),
                        project_path: ":lib".into(),
                        build_type: Some("debug".into()),
                        product_flavors: BTreeMap::new(),
                        is_test_fixtures: false,
                    }),
                ),
                ("guava".to_string(), external("com.google.guava:guava:31.1")),
            ]),
        };

        let variant = cache.variant_from_v2(&core("debug"), &dependencies, &resolvers()).unwrap();
        assert_eq!(variant.main_artifact.libraries.len(), 1);
        assert_eq!(
            variant.main_artifact.module_dependencies,
            vec![IdeModuleDependency { build_id: Some("/p".into()), project_path: ":lib".into(), variant: Some("debug".into()) }]
        );
        assert!(variant.unit_test_artifact.is_some());
        assert_eq!(cache.library_count(), 1);
    }

    #[test]
    fn test_missing_library_key_is_invalid() {
        let cache = ModelCache::new();
        let dependencies = v2::VariantDependencies {
            name: "debug".into(),
            main_artifact: v2::ArtifactDependencies {
                compile_dependencies: vec![item("ghost", vec![])],
                unresolved_dependencies: Vec::new(),
            },
            unit_test_artifact: None,
            android_test_artifact: None,
            test_fixtures_artifact: None,
            libraries: BTreeMap::new(),
        };
        let err = cache.variant_from_v2(&core("debug"), &dependencies, &resolvers()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidModel(_)));
    }

    #[test]
    fn test_edge_outside_the_pass_becomes_unresolved() {
        let cache = ModelCache::new();
        let project = |build_id: &str, path: &str| {
            v2::Library::Project(v2::ProjectInfo {
                build_id: build_id.into(),
                project_path: path.into(),
                build_type: Some("debug".into()),
                product_flavors: BTreeMap::new(),
                is_test_fixtures: false,
            })
        };
        let dependencies = v2::VariantDependencies {
            name: "debug".into(),
            main_artifact: v2::ArtifactDependencies {
                compile_dependencies: vec![item("ghost", vec![]), item("elsewhere", vec![]), item("lib", vec![])],
                unresolved_dependencies: Vec::new(),
            },
            unit_test_artifact: None,
            android_test_artifact: None,
            test_fixtures_artifact: None,
            libraries: BTreeMap::from([
                ("ghost".to_string(), project(":", ":ghost")),
                ("elsewhere".to_string(), project("other", ":lib")),
                ("lib".to_string(), project(":", ":lib")),
            ]),
        };

        let variant = cache.variant_from_v2(&core("debug"), &dependencies, &resolvers()).unwrap();
        let names: Vec<_> = variant.main_artifact.unresolved_dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["::ghost", "other:lib"]);
        assert!(variant.main_artifact.unresolved_dependencies.iter().all(|d| d.cause.is_some()));
        assert_eq!(variant.main_artifact.module_dependencies.len(), 1);
    }

    #[test]
    fn test_libraries_are_interned() {
        let cache = ModelCache::new();
        let artifact = v1::Artifact {
            module_dependencies: Vec::new(),
            libraries: vec![v1::LibraryDependency {
                artifact_address: "androidx.core:core:1.12.0".into(),
                kind: v1::LibraryKind::Android,
                artifact: None,
            }],
            unresolved_dependencies: Vec::new(),
        };
        let first = cache.artifact_from_v1(&artifact);
        let second = cache.artifact_from_v1(&artifact);
        assert!(Arc::ptr_eq(&first.libraries[0], &second.libraries[0]));
    }

    #[test]
    fn test_v2_sync_issue_drops_null_lines() {
        let cache = ModelCache::new();
        let issues = cache.sync_issues_from_v2(&[v2::SyncIssue {
            severity: 1,
            issue_type: 0,
            data: None,
            message: "deprecated".into(),
            multi_line_message: Some(vec![Some("a".into()), None, Some("b".into())]),
        }]);
        assert_eq!(issues[0].multi_line_message, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
