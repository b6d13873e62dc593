//! Variant Resolution
//!
//! Decides which variant (and ABI) every Android module is synced with
//! and fetches the variant models.
//!
//! App modules drive the choice: their selected variant is resolved
//! first and the module edges of the resolved variant name the variant
//! each dependency must be built as. Dependencies are then resolved level
//! by level. Modules nobody depends on fall back to their previous
//! selection or their default variant.

use std::collections::{HashMap, HashSet, VecDeque};

use r_droid_core::config::SyncFlags;
use tracing::{debug, info, warn};

use crate::controller::{android_source_sets, fetch_kotlin_models, BuildController, ControllerExt, ModelRequest, Target};
use crate::error::{Result, SyncError};
use crate::model::{IdeNativeVariantAbi, IdeUnresolvedDependency, IdeVariant};
use crate::model_cache::ModelCache;
use crate::module::{AndroidModule, ModuleConfiguration, NativeModelVersion};
use crate::options::SingleVariantSyncOptions;
use crate::protocol::{self, AndroidProjectType, KaptGradleModel, KotlinGradleModel};
use crate::resolver::VariantNameResolvers;
use crate::runner::{action, ActionRunner, FetchAction};
use crate::selection::{SelectedVariants, VariantDetails, VariantSelectionChange};

/// ABI requested when the previous selection is unusable
pub const PREFERRED_ABI: &str = "x86";

/// Read-only state shared by every fetch action of the resolution phase
#[derive(Clone, Copy)]
pub struct VariantContext<'a> {
    pub modules: &'a HashMap<String, AndroidModule>,
    pub cache: &'a ModelCache,
    pub resolvers: &'a VariantNameResolvers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeVariantAbiResult {
    V1(IdeNativeVariantAbi),
    V2 { selected_abi: String },
    None,
}

impl NativeVariantAbiResult {
    pub fn abi(&self) -> Option<&str> {
        match self {
            NativeVariantAbiResult::V1(variant_abi) => Some(&variant_abi.abi),
            NativeVariantAbiResult::V2 { selected_abi } => Some(selected_abi),
            NativeVariantAbiResult::None => None,
        }
    }
}

/// Outcome of the ABI choice for one module variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiChoice {
    NotNative,
    Abi(String),
    /// Native module reporting no ABI for the variant
    NoValidAbi,
}

/// Resolved variant of one module
#[derive(Debug, Clone)]
pub struct SyncVariantResultCore {
    pub configuration: ModuleConfiguration,
    pub variant: IdeVariant,
    pub native_variant_abi: NativeVariantAbiResult,
    pub native_abi_error: Option<String>,
    pub unresolved_dependencies: Vec<IdeUnresolvedDependency>,
}

#[derive(Debug, Clone)]
pub struct SyncVariantResult {
    pub core: SyncVariantResultCore,
    /// Configurations of the modules this variant depends on
    pub module_dependencies: Vec<ModuleConfiguration>,
}

/// Everything the resolution phase learned about one module
#[derive(Debug, Clone, Default)]
pub struct ModuleVariantOutcome {
    pub synced_variant: Option<IdeVariant>,
    pub all_variants: Option<Vec<IdeVariant>>,
    pub synced_native_variant: Option<IdeNativeVariantAbi>,
    pub synced_native_variant_abi_name: Option<String>,
    pub native_abi_error: Option<String>,
    pub unresolved_dependencies: Vec<IdeUnresolvedDependency>,
    pub kotlin_gradle_model: Option<KotlinGradleModel>,
    pub kapt_gradle_model: Option<KaptGradleModel>,
}

#[derive(Debug, Default)]
pub struct VariantResolution {
    pub outcomes: HashMap<String, ModuleVariantOutcome>,
    /// Module ids requested during the walk
    pub visited: HashSet<String>,
    /// Prefetched models that did not match the walk
    pub discarded_prefetches: usize,
}

/// Previously selected variant if still valid, otherwise the default
fn select_variant_for_app_or_leaf(module: &AndroidModule, selected: &SelectedVariants) -> Option<String> {
    selected
        .selected_variant(&module.id())
        .filter(|name| module.has_variant(name))
        .map(str::to_string)
        .or_else(|| module.default_variant_name.clone())
}

/// Initial work queue: the switched module, then app modules, then the rest
fn requested_or_default_configurations(modules: &[&AndroidModule], options: &SingleVariantSyncOptions) -> VecDeque<ModuleConfiguration> {
    let mut configurations: Vec<(u8, ModuleConfiguration)> = modules
        .iter()
        .filter_map(|module| {
            let id = module.id();
            let variant = select_variant_for_app_or_leaf(module, &options.selected_variants)?;
            let abi = options.selected_variants.selected_abi(&id).map(str::to_string);
            let rank = if options.module_id_with_variant_switched.as_deref() == Some(id.as_str()) {
                0
            } else if module.project_type() == AndroidProjectType::App {
                1
            } else {
                2
            };
            Some((rank, ModuleConfiguration::new(id, variant, abi)))
        })
        .collect();
    configurations.sort_by_key(|(rank, _)| *rank);
    configurations.into_iter().map(|(_, c)| c).collect()
}

pub fn choose_abi(module: &AndroidModule, variant: &str, selected_abi: Option<&str>) -> AbiChoice {
    if module.native_model_version() == NativeModelVersion::None {
        return AbiChoice::NotNative;
    }
    let Some(abi_names) = module.variant_abi_names(variant) else {
        return AbiChoice::NotNative;
    };
    if let Some(selected) = selected_abi.filter(|abi| abi_names.iter().any(|a| a == abi)) {
        return AbiChoice::Abi(selected.to_string());
    }
    if abi_names.iter().any(|a| a == PREFERRED_ABI) {
        return AbiChoice::Abi(PREFERRED_ABI.to_string());
    }
    abi_names.first().map_or(AbiChoice::NoValidAbi, |abi| AbiChoice::Abi(abi.clone()))
}

fn fetch_native_variant_abi(
    controller: &dyn BuildController,
    cache: &ModelCache,
    module: &AndroidModule,
    variant: &str,
    abi: &str,
) -> Result<NativeVariantAbiResult> {
    let target = Target::Project(module.identifier());
    if module.native_model_version() == NativeModelVersion::V2 {
        // The answer is dropped; the request makes the build write the
        // build information to disk.
        let request = ModelRequest::NativeModule {
            variants: Some(vec![variant.to_string()]),
            abis: Some(vec![abi.to_string()]),
        };
        Ok(match controller.find_native_module(target, &request)? {
            Some(_) => NativeVariantAbiResult::V2 { selected_abi: abi.to_string() },
            None => NativeVariantAbiResult::None,
        })
    } else {
        let request = ModelRequest::NativeVariantAbi { variant: variant.to_string(), abi: abi.to_string() };
        Ok(match controller.find_native_variant_abi(target, &request)? {
            Some(model) => NativeVariantAbiResult::V1(cache.native_variant_abi_from(&model)),
            None => NativeVariantAbiResult::None,
        })
    }
}

/// Fetches the variant and native models of one configuration. `None`
/// for configurations of modules that are not Android modules.
fn fetch_variant(
    controller: &dyn BuildController,
    ctx: VariantContext<'_>,
    configuration: ModuleConfiguration,
) -> Result<Option<SyncVariantResultCore>> {
    let Some(module) = ctx.modules.get(&configuration.id) else {
        return Ok(None);
    };
    let variant = module
        .variant_fetcher()
        .fetch(controller, ctx.cache, ctx.resolvers, module, &configuration.variant)?
        .ok_or_else(|| SyncError::MissingModel {
            model: "Variant",
            target: format!("{} ({})", configuration.id, configuration.variant),
        })?;

    let (native_variant_abi, native_abi_error) = match choose_abi(module, &variant.name, configuration.abi.as_deref()) {
        AbiChoice::NotNative => (NativeVariantAbiResult::None, None),
        AbiChoice::Abi(abi) => (fetch_native_variant_abi(controller, ctx.cache, module, &variant.name, &abi)?, None),
        AbiChoice::NoValidAbi => {
            warn!("No valid native ABI found to request for {} ({})", configuration.id, variant.name);
            (
                NativeVariantAbiResult::None,
                Some(format!("No valid Native abi found to request for variant '{}'", variant.name)),
            )
        }
    };

    Ok(Some(SyncVariantResultCore {
        unresolved_dependencies: variant.unresolved_dependencies(),
        configuration,
        variant,
        native_variant_abi,
        native_abi_error,
    }))
}

impl SyncVariantResultCore {
    /// Configurations of the modules the resolved variant depends on,
    /// followed by guesses for its dynamic feature modules
    pub fn module_dependency_configurations(&self, ctx: VariantContext<'_>, selected: &SelectedVariants) -> Vec<ModuleConfiguration> {
        let Some(module) = ctx.modules.get(&self.configuration.id) else {
            return Vec::new();
        };

        // The ABI of the top module is kept for all modules below it, even
        // through modules without native code.
        let abi_to_propagate = self
            .native_variant_abi
            .abi()
            .map(str::to_string)
            .or_else(|| self.configuration.abi.clone());

        let newly_selected =
            VariantDetails::from_variant(&module.android_project.flavor_dimensions, &self.variant, self.native_variant_abi.abi());
        let change = VariantSelectionChange::extract(&newly_selected, selected.details(&self.configuration.id));

        // Best-effort guess for an edge without a variant: apply the same
        // change to the dependency's previous selection.
        let propagate_fallback = |dependency_id: String| -> Option<ModuleConfiguration> {
            let dependency = ctx.modules.get(&dependency_id)?;
            let details = selected.details(&dependency_id)?;
            let guessed = details.apply_change(change.as_ref().unwrap_or(&VariantSelectionChange::EMPTY));
            if !dependency.has_variant(&guessed.name) {
                debug!("Guessed variant '{}' does not exist in {}", guessed.name, dependency_id);
                return None;
            }
            Some(ModuleConfiguration::new(dependency_id, guessed.name, abi_to_propagate.clone()))
        };

        let mut configurations = Vec::new();
        let mut seen = HashSet::new();
        for dependency in self.variant.module_dependencies() {
            let build_root = dependency
                .build_id
                .clone()
                .unwrap_or_else(|| module.build_root().display().to_string());
            let dependency_id = format!("{}{}", build_root, dependency.project_path);
            let configuration = match &dependency.variant {
                Some(variant) => Some(ModuleConfiguration::new(dependency_id, variant.clone(), abi_to_propagate.clone())),
                None => propagate_fallback(dependency_id),
            };
            if let Some(configuration) = configuration.filter(|c| seen.insert(c.clone())) {
                configurations.push(configuration);
            }
        }

        configurations.extend(
            module
                .android_project
                .dynamic_features
                .iter()
                .filter_map(|feature| propagate_fallback(protocol::module_id(module.build_root(), feature))),
        );
        configurations
    }
}

fn variant_and_dependencies_action<'a>(
    ctx: VariantContext<'a>,
    configuration: ModuleConfiguration,
    selected: &'a SelectedVariants,
) -> FetchAction<'a, Option<SyncVariantResult>> {
    action(move |controller| {
        let Some(core) = fetch_variant(controller, ctx, configuration)? else {
            return Ok(None);
        };
        let module_dependencies = core.module_dependency_configurations(ctx, selected);
        Ok(Some(SyncVariantResult { core, module_dependencies }))
    })
}

fn kotlin_models_action<'a>(
    module: &'a AndroidModule,
    source_sets: Vec<String>,
) -> FetchAction<'a, (Option<KotlinGradleModel>, Option<KaptGradleModel>)> {
    action(move |controller| fetch_kotlin_models(controller, module.identifier(), source_sets))
}

/// Single-variant sync: breadth-first walk from the app modules
pub fn choose_selected_variants(
    ctx: VariantContext<'_>,
    modules: &[&AndroidModule],
    options: &SingleVariantSyncOptions,
    flags: &SyncFlags,
    variant_runner: &ActionRunner<'_>,
    sequential_runner: &ActionRunner<'_>,
) -> Result<VariantResolution> {
    let mut resolution = VariantResolution::default();
    if modules.is_empty() {
        return Ok(resolution);
    }
    let selected = &options.selected_variants;
    let mut queue = requested_or_default_configurations(modules, options);

    // A re-sync usually keeps every selection, so the previous
    // configurations are fetched speculatively in one parallel batch.
    // Whatever the walk below does not ask for is dropped.
    let prefetch = flags.parallel_sync_enabled
        && flags.parallel_sync_prefetch_variants_enabled
        && variant_runner.parallel_actions_supported()
        && options.module_id_with_variant_switched.is_none();
    let mut prefetched: HashMap<ModuleConfiguration, SyncVariantResult> = if prefetch {
        let actions = queue
            .iter()
            .map(|c| variant_and_dependencies_action(ctx, c.clone(), selected))
            .collect();
        variant_runner
            .run_actions(actions)?
            .into_iter()
            .flatten()
            .map(|result| (result.core.configuration.clone(), result))
            .collect()
    } else {
        HashMap::new()
    };
    if prefetch {
        debug!("Prefetched {} variant models", prefetched.len());
    }

    let mut propagated: Option<Vec<ModuleConfiguration>> = None;
    let mut round = 0usize;
    loop {
        let to_request: Vec<ModuleConfiguration> = if let Some(configurations) = propagated.take() {
            configurations
                .into_iter()
                .filter(|c| resolution.visited.insert(c.id.clone()))
                .collect()
        } else if let Some(configuration) = queue.pop_front() {
            if resolution.visited.insert(configuration.id.clone()) {
                vec![configuration]
            } else {
                Vec::new()
            }
        } else {
            break;
        };
        if to_request.is_empty() {
            continue;
        }
        round += 1;
        debug!("Variant resolution round {}: {} module(s)", round, to_request.len());

        let actions: Vec<FetchAction<'_, Option<SyncVariantResult>>> = to_request
            .into_iter()
            .map(|configuration| match prefetched.remove(&configuration) {
                Some(result) => action(move |_| Ok(Some(result))),
                None => variant_and_dependencies_action(ctx, configuration, selected),
            })
            .collect();
        let results: Vec<SyncVariantResult> = variant_runner.run_actions(actions)?.into_iter().flatten().collect();

        // Kotlin models are not safe to fetch concurrently
        let kotlin_actions = results
            .iter()
            .filter_map(|result| {
                let module = ctx.modules.get(&result.core.configuration.id)?;
                Some(kotlin_models_action(module, android_source_sets(&result.core.variant.name)))
            })
            .collect();
        let kotlin_models = sequential_runner.run_actions(kotlin_actions)?;

        let next: Vec<ModuleConfiguration> = results.iter().flat_map(|r| r.module_dependencies.iter().cloned()).collect();
        for (result, (kotlin_gradle_model, kapt_gradle_model)) in results.into_iter().zip(kotlin_models) {
            let core = result.core;
            let (synced_native_variant, synced_native_variant_abi_name) = match core.native_variant_abi {
                NativeVariantAbiResult::V1(variant_abi) => {
                    let abi = variant_abi.abi.clone();
                    (Some(variant_abi), Some(abi))
                }
                NativeVariantAbiResult::V2 { selected_abi } => (None, Some(selected_abi)),
                NativeVariantAbiResult::None => (None, None),
            };
            resolution.outcomes.insert(
                core.configuration.id,
                ModuleVariantOutcome {
                    synced_variant: Some(core.variant),
                    all_variants: None,
                    synced_native_variant,
                    synced_native_variant_abi_name,
                    native_abi_error: core.native_abi_error,
                    unresolved_dependencies: core.unresolved_dependencies,
                    kotlin_gradle_model,
                    kapt_gradle_model,
                },
            );
        }
        propagated = if next.is_empty() { None } else { Some(next) };
    }

    resolution.discarded_prefetches = prefetched.len();
    if resolution.discarded_prefetches > 0 {
        debug!("Discarded {} stale prefetched variant models", resolution.discarded_prefetches);
    }
    info!(
        "Resolved variants of {} module(s) in {} round(s)",
        resolution.outcomes.len(),
        round
    );
    Ok(resolution)
}

/// All-variants sync: every declared variant of every module, no walk
pub fn sync_all_variants(
    ctx: VariantContext<'_>,
    modules: &[&AndroidModule],
    variant_runner: &ActionRunner<'_>,
    sequential_runner: &ActionRunner<'_>,
) -> Result<VariantResolution> {
    let mut resolution = VariantResolution::default();
    if modules.is_empty() {
        return Ok(resolution);
    }

    let actions: Vec<FetchAction<'_, Option<SyncVariantResultCore>>> = modules
        .iter()
        .copied()
        .flat_map(|module| {
            let id = module.id();
            module
                .all_variant_names
                .iter()
                .map(move |variant| {
                    let configuration = ModuleConfiguration::new(id.clone(), variant.clone(), None);
                    action(move |controller| fetch_variant(controller, ctx, configuration))
                })
        })
        .collect();
    let results = variant_runner.run_actions(actions)?;

    let mut variants: HashMap<String, Vec<SyncVariantResultCore>> = HashMap::new();
    for core in results.into_iter().flatten() {
        variants.entry(core.configuration.id.clone()).or_default().push(core);
    }

    // One request per module covering the source sets of all its variants
    let ordered: Vec<&AndroidModule> = modules.iter().copied().filter(|m| variants.contains_key(&m.id())).collect();
    let kotlin_actions = ordered
        .iter()
        .copied()
        .map(|module| {
            let source_sets = variants
                .get(&module.id())
                .into_iter()
                .flatten()
                .flat_map(|core| android_source_sets(&core.variant.name))
                .collect();
            kotlin_models_action(module, source_sets)
        })
        .collect();
    let kotlin_models = sequential_runner.run_actions(kotlin_actions)?;

    for (module, (kotlin_gradle_model, kapt_gradle_model)) in ordered.into_iter().zip(kotlin_models) {
        let id = module.id();
        let cores = variants.remove(&id).unwrap_or_default();
        let mut unresolved_dependencies = Vec::new();
        for dependency in cores.iter().flat_map(|c| c.unresolved_dependencies.iter()) {
            if !unresolved_dependencies.contains(dependency) {
                unresolved_dependencies.push(dependency.clone());
            }
        }
        // Reported once per module; every variant shares the native model
        let native_abi_error = cores.iter().find_map(|c| c.native_abi_error.clone());
        resolution.visited.insert(id.clone());
        resolution.outcomes.insert(
            id,
            ModuleVariantOutcome {
                all_variants: Some(cores.into_iter().map(|c| c.variant).collect()),
                native_abi_error,
                unresolved_dependencies,
                kotlin_gradle_model,
                kapt_gradle_model,
                ..ModuleVariantOutcome::default()
            },
        );
    }
    info!("Synced all variants of {} module(s)", resolution.outcomes.len());
    Ok(resolution)
}
