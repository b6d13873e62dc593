//! Gradle Modules
//!
//! Nodes of one sync pass. An [`AndroidModule`] is assembled once from
//! its base models and never mutated; everything learned later in the
//! pass is collected into a [`SyncedAndroidModule`] record when the pass
//! completes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::model::{
    IdeAndroidProject, IdeNativeAndroidProject, IdeNativeModule, IdeNativeVariantAbi, IdeSyncIssue,
    IdeUnresolvedDependency, IdeVariant,
};
use crate::model_cache::ModelCache;
use crate::project_result::{AndroidProjectResult, VariantFetcher};
use crate::protocol::{
    v1, v2, AdditionalClassifierArtifactsModel, AndroidProjectType, BasicGradleProject, KaptGradleModel,
    KotlinGradleModel, ProjectIdentifier,
};
use crate::resolver::VariantNameResolver;
use crate::version::AgpVersion;

/// Identity of a module's build variant request; used as a map key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleConfiguration {
    pub id: String,
    pub variant: String,
    pub abi: Option<String>,
}

impl ModuleConfiguration {
    pub fn new(id: impl Into<String>, variant: impl Into<String>, abi: Option<String>) -> Self {
        Self { id: id.into(), variant: variant.into(), abi }
    }
}

/// Which native model protocol a module answered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeModelVersion {
    None,
    V1,
    V2,
}

/// Android module as known after the base model phase
#[derive(Debug, Clone)]
pub struct AndroidModule {
    pub project: BasicGradleProject,
    pub agp_version: Option<AgpVersion>,
    pub build_name: Option<String>,
    pub android_project: IdeAndroidProject,
    pub all_variant_names: Vec<String>,
    pub default_variant_name: Option<String>,
    pub variant_name_resolver: VariantNameResolver,
    pub native_android_project: Option<IdeNativeAndroidProject>,
    pub native_module: Option<IdeNativeModule>,
    /// Issues carried by the base model, replaced by the sync issues model
    pub base_sync_issues: Option<Vec<IdeSyncIssue>>,
    variant_fetcher: VariantFetcher,
}

impl AndroidModule {
    pub fn create(
        project: BasicGradleProject,
        result: &AndroidProjectResult,
        native_android_project: Option<&v1::NativeAndroidProject>,
        native_module: Option<&v2::NativeModule>,
        cache: &ModelCache,
    ) -> Result<Self> {
        let native_android_project = match (result, native_android_project) {
            (AndroidProjectResult::V1Project(v1), Some(native)) => {
                Some(cache.native_android_project_from(native, v1.ndk_version.as_deref()))
            }
            (AndroidProjectResult::V2Project(_), Some(_)) => {
                return Err(SyncError::InvalidModel(format!(
                    "V2 models are not compatible with NativeAndroidProject in {}",
                    project.id()
                )))
            }
            (_, None) => None,
        };

        Ok(Self {
            agp_version: AgpVersion::try_parse(result.agp_version()),
            build_name: result.build_name().map(str::to_string),
            android_project: result.ide_android_project().clone(),
            all_variant_names: result.all_variant_names().to_vec(),
            default_variant_name: result.default_variant_name().map(str::to_string),
            variant_name_resolver: result.variant_name_resolver(),
            native_android_project,
            native_module: native_module.map(|m| cache.native_module_from(m)),
            base_sync_issues: result.sync_issues().map(<[IdeSyncIssue]>::to_vec),
            variant_fetcher: result.create_variant_fetcher(),
            project,
        })
    }

    pub fn id(&self) -> String {
        self.project.id()
    }

    pub fn identifier(&self) -> &ProjectIdentifier {
        &self.project.identifier
    }

    pub fn build_root(&self) -> &Path {
        self.project.build_root()
    }

    pub fn project_type(&self) -> AndroidProjectType {
        self.android_project.project_type
    }

    pub fn has_variant(&self, name: &str) -> bool {
        self.all_variant_names.iter().any(|n| n == name)
    }

    pub fn variant_fetcher(&self) -> &VariantFetcher {
        &self.variant_fetcher
    }

    pub fn native_model_version(&self) -> NativeModelVersion {
        if self.native_module.is_some() {
            NativeModelVersion::V2
        } else if self.native_android_project.is_some() {
            NativeModelVersion::V1
        } else {
            NativeModelVersion::None
        }
    }

    /// ABIs the native model reports for `variant`
    pub fn variant_abi_names(&self, variant: &str) -> Option<&[String]> {
        let variant_abis: &BTreeMap<String, Vec<String>> = if let Some(native) = &self.native_module {
            &native.variant_abis
        } else if let Some(native) = &self.native_android_project {
            &native.variant_abis
        } else {
            return None;
        };
        variant_abis.get(variant).map(Vec::as_slice)
    }
}

/// Plain JVM module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaModule {
    pub project: BasicGradleProject,
    pub kotlin_gradle_model: Option<KotlinGradleModel>,
    pub kapt_gradle_model: Option<KaptGradleModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum NativeVariants {
    /// Build information generated on disk by the V2 model request
    V2,
    V1 { variant_abis: Vec<IdeNativeVariantAbi> },
}

/// Module of a native-variants-only sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeVariantsAndroidModule {
    pub project: BasicGradleProject,
    pub native_variants: NativeVariants,
    pub sync_issues: Vec<IdeSyncIssue>,
}

/// Frozen state of an Android module at the end of a sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedAndroidModule {
    pub module_id: String,
    pub project: BasicGradleProject,
    pub agp_version: String,
    pub android_project: IdeAndroidProject,
    pub all_variant_names: Vec<String>,
    pub default_variant_name: Option<String>,
    pub native_android_project: Option<IdeNativeAndroidProject>,
    pub native_module: Option<IdeNativeModule>,
    pub synced_variant: Option<IdeVariant>,
    /// Every variant, in all-variants sync mode
    pub all_variants: Option<Vec<IdeVariant>>,
    pub synced_native_variant: Option<IdeNativeVariantAbi>,
    pub synced_native_variant_abi_name: Option<String>,
    /// Set when the module is native but no ABI could be chosen
    pub native_abi_error: Option<String>,
    pub kotlin_gradle_model: Option<KotlinGradleModel>,
    pub kapt_gradle_model: Option<KaptGradleModel>,
    pub additional_classifier_artifacts: Option<AdditionalClassifierArtifactsModel>,
    pub unresolved_dependencies: Vec<IdeUnresolvedDependency>,
    pub sync_issues: Vec<IdeSyncIssue>,
}

/// Node discovered in one sync pass
#[derive(Debug, Clone)]
pub enum GradleModule {
    Android(AndroidModule),
    Java(JavaModule),
}

impl GradleModule {
    pub fn project(&self) -> &BasicGradleProject {
        match self {
            GradleModule::Android(m) => &m.project,
            GradleModule::Java(m) => &m.project,
        }
    }

    pub fn id(&self) -> String {
        self.project().id()
    }

    pub fn variant_name_resolver(&self) -> VariantNameResolver {
        match self {
            GradleModule::Android(m) => m.variant_name_resolver.clone(),
            GradleModule::Java(_) => VariantNameResolver::Unresolvable,
        }
    }

    pub fn as_android(&self) -> Option<&AndroidModule> {
        match self {
            GradleModule::Android(m) => Some(m),
            GradleModule::Java(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::v1::NativeVariantInfo;

    fn project(path: &str) -> BasicGradleProject {
        BasicGradleProject {
            name: path.trim_start_matches(':').to_string(),
            identifier: ProjectIdentifier::new("/work/app", path),
        }
    }

    fn v1_result(cache: &ModelCache) -> AndroidProjectResult {
        AndroidProjectResult::from_v1(
            cache,
            &v1::AndroidProject {
                name: "native".into(),
                model_version: Some("4.1.0".into()),
                project_type: AndroidProjectType::Library,
                variant_names: Some(vec!["debug".into(), "release".into()]),
                default_variant: None,
                flavor_dimensions: Vec::new(),
                build_types: vec!["debug".into(), "release".into()],
                product_flavors: Vec::new(),
                dynamic_features: Vec::new(),
                sync_issues: None,
                ndk_version: Some("21.4.7075529".into()),
            },
        )
    }

    #[test]
    fn test_v1_native_project() {
        let cache = ModelCache::new();
        let native = v1::NativeAndroidProject {
            name: "native".into(),
            variant_infos: BTreeMap::from([(
                "debug".to_string(),
                NativeVariantInfo { abi_names: vec!["arm64-v8a".into(), "x86".into()] },
            )]),
            ndk_version: None,
        };
        let module = AndroidModule::create(project(":native"), &v1_result(&cache), Some(&native), None, &cache).unwrap();

        assert_eq!(module.id(), "/work/app:native");
        assert_eq!(module.native_model_version(), NativeModelVersion::V1);
        assert_eq!(module.variant_abi_names("debug").map(|a| a.len()), Some(2));
        assert_eq!(module.variant_abi_names("release"), None);
        assert_eq!(module.agp_version, Some(AgpVersion::new(4, 1, 0)));
        // ndk version falls back to the one reported by the project model
        assert_eq!(
            module.native_android_project.as_ref().and_then(|n| n.ndk_version.as_deref()),
            Some("21.4.7075529")
        );
    }

    #[test]
    fn test_module_without_native_models() {
        let cache = ModelCache::new();
        let module = AndroidModule::create(project(":lib"), &v1_result(&cache), None, None, &cache).unwrap();
        assert_eq!(module.native_model_version(), NativeModelVersion::None);
        assert!(module.has_variant("release"));
        assert!(!module.has_variant("staging"));
    }

    #[test]
    fn test_configuration_equality() {
        let a = ModuleConfiguration::new("/p:app", "debug", None);
        let b = ModuleConfiguration::new("/p:app", "debug", None);
        let c = ModuleConfiguration::new("/p:app", "debug", Some("x86".into()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
