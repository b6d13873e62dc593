//! Android Project Result
//!
//! One module's base Android project, normalized across the two builder
//! model protocols. Both shapes answer the same questions (plugin
//! version, variant names, default variant, base sync issues, variant
//! name resolver) and hand out the matching [`VariantFetcher`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::controller::{BuildController, ControllerExt, ModelRequest, Target};
use crate::error::{Result, SyncError};
use crate::model::{IdeAndroidProject, IdeSyncIssue, IdeVariant, IdeVariantCore};
use crate::model_cache::ModelCache;
use crate::module::AndroidModule;
use crate::protocol::{v1, v2};
use crate::resolver::{ResolvableVariant, VariantNameResolver, VariantNameResolvers};

const DEFAULT_VARIANT: &str = "debug";
const TEST_FIXTURES_SUFFIX: &str = "TestFixtures";

/// Legacy single-model project
#[derive(Debug, Clone)]
pub struct V1ProjectResult {
    agp_version: String,
    ide_android_project: IdeAndroidProject,
    all_variant_names: Vec<String>,
    default_variant_name: Option<String>,
    sync_issues: Option<Vec<IdeSyncIssue>>,
    pub ndk_version: Option<String>,
}

/// Split-model project; variant headers are known up front
#[derive(Debug, Clone)]
pub struct V2ProjectResult {
    pub build_name: String,
    agp_version: String,
    ide_android_project: IdeAndroidProject,
    variants: Vec<IdeVariantCore>,
    all_variant_names: Vec<String>,
    default_variant_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AndroidProjectResult {
    V1Project(V1ProjectResult),
    V2Project(V2ProjectResult),
}

impl AndroidProjectResult {
    pub fn from_v1(cache: &ModelCache, project: &v1::AndroidProject) -> Self {
        let all_variant_names = distinct(project.variant_names.iter().flatten().cloned());
        let default_variant_name = project
            .default_variant
            .clone()
            .or_else(|| default_or_first(&all_variant_names, DEFAULT_VARIANT));

        AndroidProjectResult::V1Project(V1ProjectResult {
            agp_version: project.model_version.clone().unwrap_or_default(),
            ide_android_project: cache.android_project_from_v1(project),
            all_variant_names,
            default_variant_name,
            sync_issues: project.sync_issues.as_deref().map(|issues| cache.sync_issues_from_v1(issues)),
            ndk_version: project.ndk_version.clone(),
        })
    }

    pub fn from_v2(
        cache: &ModelCache,
        basic: &v2::BasicAndroidProject,
        project: &v2::AndroidProject,
        versions: &v2::Versions,
        dsl: &v2::AndroidDsl,
    ) -> Result<Self> {
        let basic_variants: BTreeMap<&str, &v2::BasicVariant> =
            basic.variants.iter().map(|v| (v.name.as_str(), v)).collect();

        let variants = project
            .variants
            .iter()
            .map(|variant| {
                let basic_variant = basic_variants.get(variant.name.as_str()).ok_or_else(|| {
                    SyncError::InvalidModel(format!("BasicVariant not found. Name: {}", variant.name))
                })?;
                Ok(cache.variant_core_from_v2(basic_variant, variant))
            })
            .collect::<Result<Vec<_>>>()?;

        let all_variant_names = distinct(basic.variants.iter().map(|v| v.name.clone()));
        let default_variant_name = default_v2_variant(&basic.variants, dsl)
            .or_else(|| default_or_first(&all_variant_names, DEFAULT_VARIANT));

        Ok(AndroidProjectResult::V2Project(V2ProjectResult {
            build_name: basic.build_name.clone(),
            agp_version: versions.agp.clone(),
            ide_android_project: cache.android_project_from_v2(basic, project, versions, dsl),
            variants,
            all_variant_names,
            default_variant_name,
        }))
    }

    pub fn agp_version(&self) -> &str {
        match self {
            AndroidProjectResult::V1Project(p) => &p.agp_version,
            AndroidProjectResult::V2Project(p) => &p.agp_version,
        }
    }

    pub fn ide_android_project(&self) -> &IdeAndroidProject {
        match self {
            AndroidProjectResult::V1Project(p) => &p.ide_android_project,
            AndroidProjectResult::V2Project(p) => &p.ide_android_project,
        }
    }

    pub fn all_variant_names(&self) -> &[String] {
        match self {
            AndroidProjectResult::V1Project(p) => &p.all_variant_names,
            AndroidProjectResult::V2Project(p) => &p.all_variant_names,
        }
    }

    pub fn default_variant_name(&self) -> Option<&str> {
        match self {
            AndroidProjectResult::V1Project(p) => p.default_variant_name.as_deref(),
            AndroidProjectResult::V2Project(p) => p.default_variant_name.as_deref(),
        }
    }

    /// Issues carried by the base model. V2 reports them only through
    /// the dedicated sync issues model.
    pub fn sync_issues(&self) -> Option<&[IdeSyncIssue]> {
        match self {
            AndroidProjectResult::V1Project(p) => p.sync_issues.as_deref(),
            AndroidProjectResult::V2Project(_) => None,
        }
    }

    pub fn build_name(&self) -> Option<&str> {
        match self {
            AndroidProjectResult::V1Project(_) => None,
            AndroidProjectResult::V2Project(p) => Some(&p.build_name),
        }
    }

    pub fn variant_name_resolver(&self) -> VariantNameResolver {
        match self {
            AndroidProjectResult::V1Project(_) => VariantNameResolver::Unresolvable,
            AndroidProjectResult::V2Project(p) => {
                let dimensions = &p.ide_android_project.flavor_dimensions;
                VariantNameResolver::V2(
                    p.variants
                        .iter()
                        .map(|variant| ResolvableVariant {
                            name: variant.name.clone(),
                            build_type: variant.build_type.clone(),
                            flavors: dimensions.iter().cloned().zip(variant.product_flavors.iter().cloned()).collect(),
                        })
                        .collect(),
                )
            }
        }
    }

    pub fn create_variant_fetcher(&self) -> VariantFetcher {
        match self {
            AndroidProjectResult::V1Project(_) => VariantFetcher::V1,
            AndroidProjectResult::V2Project(p) => VariantFetcher::V2 { variants: p.variants.clone() },
        }
    }
}

/// Fetches one variant of a module with the protocol its base model
/// came from. Holds only variant headers, never the raw base models.
#[derive(Debug, Clone)]
pub enum VariantFetcher {
    V1,
    V2 { variants: Vec<IdeVariantCore> },
}

impl VariantFetcher {
    /// `Ok(None)` when the build produced no model for the variant
    pub fn fetch(
        &self,
        controller: &dyn BuildController,
        cache: &ModelCache,
        resolvers: &VariantNameResolvers,
        module: &AndroidModule,
        variant_name: &str,
    ) -> Result<Option<IdeVariant>> {
        let target = Target::Project(module.identifier());
        match self {
            VariantFetcher::V1 => {
                let variant_name = adjust_for_test_fixtures_suffix(&module.all_variant_names, variant_name);
                let variant = controller.find_v1_variant(target, &ModelRequest::Variant { variant: variant_name })?;
                Ok(variant.map(|v| cache.variant_from_v1(&v)))
            }
            VariantFetcher::V2 { variants } => {
                let core = variants.iter().find(|v| v.name == variant_name).ok_or_else(|| SyncError::UnknownVariant {
                    module_id: module.id(),
                    variant: variant_name.to_string(),
                })?;
                let request = ModelRequest::VariantDependencies { variant: variant_name.to_string() };
                match controller.find_variant_dependencies(target, &request)? {
                    Some(dependencies) => cache.variant_from_v2(core, &dependencies, resolvers).map(Some),
                    None => Ok(None),
                }
            }
        }
    }
}

/// V1 plugins name test fixture variants after their tested variant
fn adjust_for_test_fixtures_suffix(all_variant_names: &[String], variant_name: &str) -> String {
    match variant_name.strip_suffix(TEST_FIXTURES_SUFFIX) {
        Some(stripped)
            if !all_variant_names.iter().any(|n| n == variant_name) && all_variant_names.iter().any(|n| n == stripped) =>
        {
            debug!("Requesting '{}' in place of '{}'", stripped, variant_name);
            stripped.to_string()
        }
        _ => variant_name.to_string(),
    }
}

fn distinct(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names.filter(|n| seen.insert(n.clone())).collect()
}

/// `preferred` when present, otherwise the lexicographically first name
fn default_or_first(names: &[String], preferred: &str) -> Option<String> {
    if names.iter().any(|n| n == preferred) {
        return Some(preferred.to_string());
    }
    names.iter().min().cloned()
}

/// Variant made of the default build type and the default flavor of
/// every dimension, if the project has one
fn default_v2_variant(variants: &[v2::BasicVariant], dsl: &v2::AndroidDsl) -> Option<String> {
    let build_types: Vec<String> = dsl.build_types.iter().map(|b| b.name.clone()).collect();
    let build_type = dsl
        .build_types
        .iter()
        .find(|b| b.is_default == Some(true))
        .map(|b| b.name.clone())
        .or_else(|| default_or_first(&build_types, DEFAULT_VARIANT));

    let mut dimensions: Vec<Option<&str>> = dsl.flavor_dimensions.iter().map(|d| Some(d.as_str())).collect();
    if dsl.product_flavors.iter().any(|f| f.dimension.is_none()) {
        dimensions.push(None);
    }
    let flavors: Vec<String> = dimensions
        .into_iter()
        .filter_map(|dimension| {
            let candidates: Vec<&v2::ProductFlavorDsl> =
                dsl.product_flavors.iter().filter(|f| f.dimension.as_deref() == dimension).collect();
            candidates
                .iter()
                .find(|f| f.is_default == Some(true))
                .or_else(|| candidates.iter().min_by(|a, b| a.name.cmp(&b.name)))
                .map(|f| f.name.clone())
        })
        .collect();

    variants
        .iter()
        .find(|v| v.build_type == build_type && v.product_flavors == flavors)
        .map(|v| v.name.clone())
}
