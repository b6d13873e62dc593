//! Variant selection state
//!
//! The IDE's previous per-module choice of variant and ABI, and the
//! delta machinery used to carry a changed choice over to dependency
//! modules that have no explicit variant edge.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::controller::append_capitalized;
use crate::model::IdeVariant;

/// Structural description of a variant: build type, flavor per dimension
/// and ABI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDetails {
    pub name: String,
    pub build_type: Option<String>,
    /// `(dimension, flavor)` in flavor-dimension order
    #[serde(default)]
    pub flavors: Vec<(String, String)>,
    #[serde(default)]
    pub abi: Option<String>,
}

impl VariantDetails {
    pub fn from_variant(flavor_dimensions: &[String], variant: &IdeVariant, abi: Option<&str>) -> Self {
        Self {
            name: variant.name.clone(),
            build_type: variant.build_type.clone(),
            flavors: flavor_dimensions
                .iter()
                .cloned()
                .zip(variant.product_flavors.iter().cloned())
                .collect(),
            abi: abi.map(str::to_string),
        }
    }

    /// Applies `change` and rebuilds the variant name from the result
    pub fn apply_change(&self, change: &VariantSelectionChange) -> VariantDetails {
        let flavors: Vec<(String, String)> = self
            .flavors
            .iter()
            .map(|(dimension, flavor)| {
                let flavor = change.flavors.get(dimension).unwrap_or(flavor);
                (dimension.clone(), flavor.clone())
            })
            .collect();
        let build_type = change.build_type.clone().or_else(|| self.build_type.clone());

        let mut name = flavors.iter().fold(String::new(), |name, (_, flavor)| append_capitalized(&name, flavor));
        if let Some(build_type) = &build_type {
            name = append_capitalized(&name, build_type);
        }

        VariantDetails {
            name,
            build_type,
            flavors,
            abi: change.abi.clone().or_else(|| self.abi.clone()),
        }
    }
}

/// What changed between the previously selected and the newly resolved
/// variant of one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantSelectionChange {
    pub build_type: Option<String>,
    /// Changed flavors per dimension
    pub flavors: BTreeMap<String, String>,
    pub abi: Option<String>,
}

impl VariantSelectionChange {
    pub const EMPTY: VariantSelectionChange = VariantSelectionChange {
        build_type: None,
        flavors: BTreeMap::new(),
        abi: None,
    };

    /// `None` when there is no previous selection to compare with
    pub fn extract(from: &VariantDetails, base: Option<&VariantDetails>) -> Option<VariantSelectionChange> {
        let base = base?;
        let base_flavors: HashMap<&str, &str> = base.flavors.iter().map(|(d, f)| (d.as_str(), f.as_str())).collect();

        Some(VariantSelectionChange {
            build_type: from.build_type.clone().filter(|b| Some(b) != base.build_type.as_ref()),
            flavors: from
                .flavors
                .iter()
                .filter(|(dimension, flavor)| base_flavors.get(dimension.as_str()) != Some(&flavor.as_str()))
                .cloned()
                .collect(),
            abi: from.abi.clone().filter(|a| Some(a) != base.abi.as_ref()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.build_type.is_none() && self.flavors.is_empty() && self.abi.is_none()
    }
}

/// Previous choice for one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedVariant {
    pub module_id: String,
    pub variant_name: String,
    #[serde(default)]
    pub abi_name: Option<String>,
    /// Details of the variant last synced for the module
    #[serde(default)]
    pub details: Option<VariantDetails>,
}

/// Persisted selection state, read once at the start of a pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedVariants {
    #[serde(default)]
    pub selected_variants: HashMap<String, SelectedVariant>,
}

impl SelectedVariants {
    pub fn new(selected: impl IntoIterator<Item = SelectedVariant>) -> Self {
        Self {
            selected_variants: selected.into_iter().map(|s| (s.module_id.clone(), s)).collect(),
        }
    }

    pub fn get(&self, module_id: &str) -> Option<&SelectedVariant> {
        self.selected_variants.get(module_id)
    }

    pub fn selected_variant(&self, module_id: &str) -> Option<&str> {
        self.get(module_id).map(|s| s.variant_name.as_str())
    }

    pub fn selected_abi(&self, module_id: &str) -> Option<&str> {
        self.get(module_id).and_then(|s| s.abi_name.as_deref())
    }

    pub fn details(&self, module_id: &str) -> Option<&VariantDetails> {
        self.get(module_id).and_then(|s| s.details.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str, flavor: &str, build_type: &str) -> VariantDetails {
        VariantDetails {
            name: name.into(),
            build_type: Some(build_type.into()),
            flavors: vec![("tier".into(), flavor.into())],
            abi: None,
        }
    }

    #[test]
    fn test_extract_change() {
        let change = VariantSelectionChange::extract(&details("fullDebug", "full", "debug"), Some(&details("freeDebug", "free", "debug"))).unwrap();
        assert_eq!(change.build_type, None);
        assert_eq!(change.flavors.get("tier").map(String::as_str), Some("full"));

        assert!(VariantSelectionChange::extract(&details("fullDebug", "full", "debug"), None).is_none());
        let same = VariantSelectionChange::extract(&details("freeDebug", "free", "debug"), Some(&details("freeDebug", "free", "debug"))).unwrap();
        assert!(same.is_empty());
    }

    #[test]
    fn test_apply_change_rebuilds_name() {
        let change = VariantSelectionChange {
            build_type: Some("release".into()),
            flavors: BTreeMap::from([("tier".to_string(), "full".to_string())]),
            abi: Some("x86".into()),
        };
        let applied = details("freeDebug", "free", "debug").apply_change(&change);
        assert_eq!(applied.name, "fullRelease");
        assert_eq!(applied.abi.as_deref(), Some("x86"));

        // dimensions the dependency does not have are ignored
        let plain = VariantDetails { name: "debug".into(), build_type: Some("debug".into()), flavors: Vec::new(), abi: None };
        assert_eq!(plain.apply_change(&change).name, "release");
        assert_eq!(plain.apply_change(&VariantSelectionChange::EMPTY).name, "debug");
    }

    #[test]
    fn test_selection_lookup() {
        let selected = SelectedVariants::new([SelectedVariant {
            module_id: "/p:app".into(),
            variant_name: "freeDebug".into(),
            abi_name: Some("arm64-v8a".into()),
            details: None,
        }]);
        assert_eq!(selected.selected_variant("/p:app"), Some("freeDebug"));
        assert_eq!(selected.selected_abi("/p:app"), Some("arm64-v8a"));
        assert_eq!(selected.selected_variant("/p:lib"), None);
    }
}
