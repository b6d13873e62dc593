//! Variant name resolution for project dependencies
//!
//! V2 dependency edges carry the build type and flavors a dependency was
//! resolved with rather than a variant name. Every module contributes a
//! [`VariantNameResolver`] that maps those attributes back to one of its
//! own variant names.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvableVariant {
    pub name: String,
    pub build_type: Option<String>,
    /// Flavor per dimension
    pub flavors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VariantNameResolver {
    /// V1 modules and non-Android modules; V1 edges name the variant themselves
    #[default]
    Unresolvable,
    V2(Vec<ResolvableVariant>),
}

impl VariantNameResolver {
    pub fn resolve(&self, build_type: Option<&str>, flavors: &BTreeMap<String, String>) -> Option<String> {
        let VariantNameResolver::V2(variants) = self else { return None };
        variants
            .iter()
            .find(|variant| {
                variant.build_type.as_deref() == build_type
                    && variant
                        .flavors
                        .iter()
                        .all(|(dimension, flavor)| flavors.get(dimension) == Some(flavor))
            })
            .map(|variant| variant.name.clone())
    }
}

/// Resolvers of every module in the sync pass plus the composite build
/// name map
#[derive(Debug, Clone, Default)]
pub struct VariantNameResolvers {
    resolvers: HashMap<(PathBuf, String), VariantNameResolver>,
    build_name_map: BTreeMap<String, PathBuf>,
}

impl VariantNameResolvers {
    pub fn new(build_name_map: BTreeMap<String, PathBuf>) -> Self {
        Self {
            resolvers: HashMap::new(),
            build_name_map,
        }
    }

    pub fn insert(&mut self, build_root: PathBuf, project_path: String, resolver: VariantNameResolver) {
        self.resolvers.insert((build_root, project_path), resolver);
    }

    pub fn get(&self, build_root: &Path, project_path: &str) -> Result<&VariantNameResolver> {
        self.resolvers
            .get(&(build_root.to_path_buf(), project_path.to_string()))
            .ok_or_else(|| SyncError::UnresolvableProject {
                build_root: build_root.display().to_string(),
                project_path: project_path.to_string(),
            })
    }

    /// Build root of a build referenced by name
    pub fn build_root(&self, build_name: &str) -> Result<&Path> {
        self.build_name_map
            .get(build_name)
            .map(PathBuf::as_path)
            .ok_or_else(|| SyncError::InvalidModel(format!("Build name '{}' is not part of the build map", build_name)))
    }

    pub fn build_name_map(&self) -> &BTreeMap<String, PathBuf> {
        &self.build_name_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flavors(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(d, f)| (d.to_string(), f.to_string())).collect()
    }

    fn resolver() -> VariantNameResolver {
        VariantNameResolver::V2(vec![
            ResolvableVariant { name: "freeDebug".into(), build_type: Some("debug".into()), flavors: flavors(&[("tier", "free")]) },
            ResolvableVariant { name: "paidDebug".into(), build_type: Some("debug".into()), flavors: flavors(&[("tier", "paid")]) },
            ResolvableVariant { name: "paidRelease".into(), build_type: Some("release".into()), flavors: flavors(&[("tier", "paid")]) },
        ])
    }

    #[test]
    fn test_resolves_by_attributes() {
        let r = resolver();
        assert_eq!(r.resolve(Some("debug"), &flavors(&[("tier", "paid")])), Some("paidDebug".into()));
        // extra dimensions of the consumer are ignored
        assert_eq!(r.resolve(Some("release"), &flavors(&[("tier", "paid"), ("api", "v2")])), Some("paidRelease".into()));
        assert_eq!(r.resolve(Some("release"), &flavors(&[("tier", "free")])), None);
    }

    #[test]
    fn test_v1_resolver_resolves_nothing() {
        assert_eq!(VariantNameResolver::Unresolvable.resolve(Some("debug"), &BTreeMap::new()), None);
    }

    #[test]
    fn test_unknown_project_is_fatal() {
        let mut resolvers = VariantNameResolvers::new(BTreeMap::from([(":".to_string(), PathBuf::from("/p"))]));
        resolvers.insert(PathBuf::from("/p"), ":app".into(), resolver());

        assert!(resolvers.get(Path::new("/p"), ":app").is_ok());
        assert!(matches!(resolvers.get(Path::new("/p"), ":gone"), Err(SyncError::UnresolvableProject { .. })));
        assert_eq!(resolvers.build_root(":").unwrap(), Path::new("/p"));
        assert!(resolvers.build_root("other").is_err());
    }
}
