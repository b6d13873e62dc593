//! Sync action options
//!
//! What a sync pass is asked to do. Feature flags are not part of this;
//! they arrive as [`SyncFlags`](r_droid_core::config::SyncFlags).

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::selection::SelectedVariants;

/// Libraries whose classifier artifacts the IDE already has
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalClassifierArtifactsOptions {
    #[serde(default)]
    pub cached_libraries: HashSet<String>,
    #[serde(default)]
    pub download_androidx_ui_samples_sources: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleVariantSyncOptions {
    #[serde(default)]
    pub selected_variants: SelectedVariants,
    /// Module whose variant the user just switched in the IDE
    #[serde(default)]
    pub module_id_with_variant_switched: Option<String>,
    #[serde(default)]
    pub classifier_artifacts: AdditionalClassifierArtifactsOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllVariantsSyncOptions {
    #[serde(default)]
    pub classifier_artifacts: AdditionalClassifierArtifactsOptions,
}

/// Regenerates native build information for already-imported modules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeVariantsSyncOptions {
    /// Variant to generate, per module id
    #[serde(default)]
    pub module_variants: HashMap<String, String>,
    #[serde(default)]
    pub requested_abis: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SyncOptions {
    SingleVariant(SingleVariantSyncOptions),
    AllVariants(AllVariantsSyncOptions),
    NativeVariants(NativeVariantsSyncOptions),
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions::SingleVariant(SingleVariantSyncOptions::default())
    }
}

impl SyncOptions {
    pub fn classifier_artifacts(&self) -> Option<&AdditionalClassifierArtifactsOptions> {
        match self {
            SyncOptions::SingleVariant(o) => Some(&o.classifier_artifacts),
            SyncOptions::AllVariants(o) => Some(&o.classifier_artifacts),
            SyncOptions::NativeVariants(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options: SyncOptions = serde_json::from_str(
            r#"{
                "mode": "single_variant",
                "module_id_with_variant_switched": "/p:app",
                "selected_variants": {
                    "selected_variants": {
                        "/p:app": { "module_id": "/p:app", "variant_name": "fullDebug" }
                    }
                }
            }"#,
        )
        .unwrap();

        let SyncOptions::SingleVariant(single) = options else { panic!("wrong mode") };
        assert_eq!(single.module_id_with_variant_switched.as_deref(), Some("/p:app"));
        assert_eq!(single.selected_variants.selected_variant("/p:app"), Some("fullDebug"));
        assert!(single.classifier_artifacts.cached_libraries.is_empty());
    }

    #[test]
    fn test_native_options_have_no_classifier_request() {
        let options: SyncOptions = serde_json::from_str(r#"{ "mode": "native_variants", "requested_abis": ["x86"] }"#).unwrap();
        assert!(options.classifier_artifacts().is_none());
    }
}
