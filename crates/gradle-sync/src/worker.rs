//! Model Provider Worker
//!
//! Runs one sync pass against a build controller:
//! - discovers every project and probes which model protocol it speaks
//! - fetches base models (V2 in parallel when every plugin allows it)
//! - resolves the variant of every Android module
//! - fetches classifier artifacts and sync issues
//! - delivers the frozen module records to the consumer
//!
//! Deliveries are buffered until the pass completes. A fatal error
//! replaces them with a single [`IdeAndroidSyncError`](crate::IdeAndroidSyncError).

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use r_droid_core::config::{AgpVersionPolicy, AppConfig, SyncFlags};
use tracing::{debug, error, info, warn};

use crate::artifacts::{fetch_additional_classifier_artifacts, library_coordinates};
use crate::consumer::{BuildModelConsumer, DeliveredModel, Delivery, DeliveryTarget};
use crate::controller::{BuildController, ControllerExt, ModelRequest, Target};
use crate::error::Result;
use crate::issues::{fetch_sync_issues, merge_sync_issues, IssueRequest};
use crate::model_cache::ModelCache;
use crate::module::{
    AndroidModule, GradleModule, JavaModule, NativeVariants, NativeVariantsAndroidModule, SyncedAndroidModule,
};
use crate::options::{AdditionalClassifierArtifactsOptions, NativeVariantsSyncOptions, SyncOptions};
use crate::project_result::AndroidProjectResult;
use crate::protocol::{v2, BasicGradleProject, GradleBuild};
use crate::resolver::VariantNameResolvers;
use crate::runner::{action, ActionRunner, FetchAction};
use crate::variants::{choose_selected_variants, sync_all_variants, VariantContext, VariantResolution};
use crate::version::{can_fetch_v2_models, can_use_parallel_sync, AgpVersion, CompatibilityChecker};

/// Project after the protocol probe, before its models are fetched
#[derive(Debug, Clone)]
pub enum BasicIncompleteGradleModule {
    /// Plugin recent enough for the split V2 models
    V2 { project: BasicGradleProject, versions: v2::Versions },
    /// V1 Android project or a non-Android project
    NonV2 { project: BasicGradleProject },
}

pub struct ModelProviderWorker<'c> {
    controller: &'c dyn BuildController,
    options: SyncOptions,
    flags: SyncFlags,
    policy: AgpVersionPolicy,
    builds: Vec<GradleBuild>,
}

impl<'c> ModelProviderWorker<'c> {
    pub fn new(controller: &'c dyn BuildController, config: &AppConfig, options: SyncOptions, builds: Vec<GradleBuild>) -> Self {
        Self {
            controller,
            options,
            flags: config.sync.clone(),
            policy: config.agp.clone(),
            builds,
        }
    }

    /// Runs the pass and hands every resulting model to `consumer`
    pub fn populate_build_models(&self, consumer: &mut dyn BuildModelConsumer) {
        let Some(main_build) = self.builds.first() else {
            warn!("Nothing to sync: no Gradle builds");
            return;
        };

        match self.sync() {
            Ok(deliveries) => {
                info!("Sync finished, delivering {} models", deliveries.len());
                for delivery in deliveries {
                    consumer.consume(delivery.target, delivery.model);
                }
            }
            Err(e) => {
                error!("Sync failed: {}", e);
                consumer.consume(
                    DeliveryTarget::Build { root_dir: main_build.root_dir.clone() },
                    DeliveredModel::SyncError(e.to_ide_error()),
                );
            }
        }
    }

    fn sync(&self) -> Result<Vec<Delivery>> {
        let checker = CompatibilityChecker::new(&self.policy, self.flags.disable_forced_upgrades)?;
        let sequential = ActionRunner::sequential(self.controller);
        let maybe_parallel = if self.flags.parallel_sync_enabled {
            ActionRunner::maybe_parallel(self.controller, self.flags.parallel_threads)?
        } else {
            sequential.clone()
        };

        let mut deliveries = Vec::new();
        match &self.options {
            SyncOptions::NativeVariants(options) => {
                self.deliver_idea_project(&sequential, &mut deliveries)?;
                let modules = self.fetch_native_variants_modules(&maybe_parallel, &sequential, options)?;
                deliveries.extend(modules.into_iter().map(|module| Delivery {
                    target: DeliveryTarget::Project(module.project.identifier.clone()),
                    model: DeliveredModel::NativeVariantsModule(module),
                }));
            }
            SyncOptions::SingleVariant(_) | SyncOptions::AllVariants(_) => {
                self.deliver_idea_project(&sequential, &mut deliveries)?;
                let modules = self.populate_android_models(&checker, &maybe_parallel, &sequential)?;
                deliveries.extend(modules);
            }
        }
        Ok(deliveries)
    }

    fn projects(&self) -> impl Iterator<Item = &BasicGradleProject> {
        self.builds.iter().flat_map(|build| build.projects.iter())
    }

    /// The root IDE project is not safe to request concurrently
    fn deliver_idea_project(&self, sequential: &ActionRunner<'_>, deliveries: &mut Vec<Delivery>) -> Result<()> {
        let idea_project = sequential.run_action(|controller| controller.find_idea_project(Target::Session, &ModelRequest::IdeaProject))?;
        if let (Some(idea_project), Some(build)) = (idea_project, self.builds.first()) {
            deliveries.push(Delivery {
                target: DeliveryTarget::Build { root_dir: build.root_dir.clone() },
                model: DeliveredModel::IdeaProject(idea_project),
            });
        }
        Ok(())
    }

    /// Probes every project for V2 support
    pub fn basic_incomplete_modules(
        &self,
        checker: &CompatibilityChecker,
        runner: &ActionRunner<'_>,
    ) -> Result<Vec<BasicIncompleteGradleModule>> {
        let use_v2 = self.flags.use_v2_builder_models;
        let actions: Vec<FetchAction<'_, BasicIncompleteGradleModule>> = self
            .projects()
            .map(|project| {
                action(move |controller| {
                    if use_v2 {
                        let versions = controller.find_versions(Target::Project(&project.identifier), &ModelRequest::Versions)?;
                        if let Some(versions) = versions {
                            checker.check(Some(&versions.agp))?;
                            if can_fetch_v2_models(AgpVersion::try_parse(&versions.agp).as_ref()) {
                                return Ok(BasicIncompleteGradleModule::V2 { project: project.clone(), versions });
                            }
                        }
                    }
                    Ok(BasicIncompleteGradleModule::NonV2 { project: project.clone() })
                })
            })
            .collect();
        runner.run_actions(actions)
    }

    /// Build name to build root of every build, plus `":"` for the main build
    fn build_name_map(&self, runner: &ActionRunner<'_>) -> Result<BTreeMap<String, PathBuf>> {
        let mut build_name_map = BTreeMap::new();
        for build in &self.builds {
            let build_map = runner.run_action(|controller| {
                controller.find_build_map(Target::Build(&build.root_dir), &ModelRequest::BuildMap)
            })?;
            if let Some(build_map) = build_map {
                build_name_map.extend(build_map.build_id_map);
            }
        }
        if let Some(main_build) = self.builds.first() {
            build_name_map.insert(":".to_string(), main_build.root_dir.clone());
        }
        Ok(build_name_map)
    }

    fn fetch_v2_android_modules(
        &self,
        runner: &ActionRunner<'_>,
        cache: &ModelCache,
        modules: Vec<(BasicGradleProject, v2::Versions)>,
    ) -> Result<Vec<AndroidModule>> {
        let actions: Vec<FetchAction<'_, Option<AndroidModule>>> = modules
            .into_iter()
            .map(|(project, versions)| {
                action(move |controller| {
                    let target = Target::Project(&project.identifier);
                    let basic = controller.find_basic_android_project(target, &ModelRequest::BasicAndroidProject)?;
                    let android_project = controller.find_v2_android_project(target, &ModelRequest::V2AndroidProject)?;
                    let dsl = controller.find_android_dsl(target, &ModelRequest::AndroidDsl)?;
                    let (Some(basic), Some(android_project), Some(dsl)) = (basic, android_project, dsl) else {
                        warn!("Incomplete V2 models for {}, skipping module", project.id());
                        return Ok(None);
                    };

                    let result = AndroidProjectResult::from_v2(cache, &basic, &android_project, &versions, &dsl)?;
                    let native_module = controller.find_native_module_basic(&project.identifier, false)?;
                    let native_android_project = match native_module {
                        Some(_) => None,
                        None => controller.find_parameterized_native_android_project(&project.identifier)?,
                    };
                    AndroidModule::create(project, &result, native_android_project.as_ref(), native_module.as_ref(), cache)
                        .map(Some)
                })
            })
            .collect();
        Ok(runner.run_actions(actions)?.into_iter().flatten().collect())
    }

    fn fetch_gradle_modules_sequentially(
        &self,
        sequential: &ActionRunner<'_>,
        checker: &CompatibilityChecker,
        cache: &ModelCache,
        projects: Vec<BasicGradleProject>,
    ) -> Result<Vec<GradleModule>> {
        let actions: Vec<FetchAction<'_, GradleModule>> = projects
            .into_iter()
            .map(|project| {
                action(move |controller| {
                    if let Some(android_project) = controller.find_parameterized_android_project(&project.identifier)? {
                        checker.check(android_project.model_version.as_deref())?;
                        let result = AndroidProjectResult::from_v1(cache, &android_project);

                        let native_module = controller.find_native_module_basic(&project.identifier, false)?;
                        let native_android_project = match native_module {
                            Some(_) => None,
                            None => controller.find_parameterized_native_android_project(&project.identifier)?,
                        };
                        let module =
                            AndroidModule::create(project, &result, native_android_project.as_ref(), native_module.as_ref(), cache)?;
                        return Ok(GradleModule::Android(module));
                    }

                    let target = Target::Project(&project.identifier);
                    let kotlin_gradle_model =
                        controller.find_kotlin_gradle_model(target, &ModelRequest::KotlinGradleModel { source_sets: None })?;
                    let kapt_gradle_model =
                        controller.find_kapt_gradle_model(target, &ModelRequest::KaptGradleModel { source_sets: None })?;
                    Ok(GradleModule::Java(JavaModule { project, kotlin_gradle_model, kapt_gradle_model }))
                })
            })
            .collect();
        sequential.run_actions(actions)
    }

    fn populate_android_models(
        &self,
        checker: &CompatibilityChecker,
        maybe_parallel: &ActionRunner<'_>,
        sequential: &ActionRunner<'_>,
    ) -> Result<Vec<Delivery>> {
        let cache = ModelCache::new();
        let basic_modules = self.basic_incomplete_modules(checker, maybe_parallel)?;
        let build_name_map = self.build_name_map(maybe_parallel)?;

        let mut v2_projects = Vec::new();
        let mut other_projects = Vec::new();
        for module in basic_modules {
            match module {
                BasicIncompleteGradleModule::V2 { project, versions } => v2_projects.push((project, versions)),
                BasicIncompleteGradleModule::NonV2 { project } => other_projects.push(project),
            }
        }

        // Parallel fetching needs every V2 plugin to support it
        let can_fetch_in_parallel = v2_projects
            .iter()
            .all(|(_, versions)| can_use_parallel_sync(AgpVersion::try_parse(&versions.agp).as_ref()));
        let variant_runner = if can_fetch_in_parallel { maybe_parallel } else { sequential };
        info!(
            "Discovered {} V2 and {} other project(s), parallel fetching {}",
            v2_projects.len(),
            other_projects.len(),
            if can_fetch_in_parallel { "enabled" } else { "disabled" }
        );

        let mut modules: Vec<GradleModule> = self
            .fetch_v2_android_modules(variant_runner, &cache, v2_projects)?
            .into_iter()
            .map(GradleModule::Android)
            .collect();
        modules.extend(self.fetch_gradle_modules_sequentially(sequential, checker, &cache, other_projects)?);

        let mut resolvers = VariantNameResolvers::new(build_name_map);
        for module in &modules {
            let project = module.project();
            resolvers.insert(project.build_root().to_path_buf(), project.path().to_string(), module.variant_name_resolver());
        }

        let android_modules: HashMap<String, AndroidModule> = modules
            .iter()
            .filter_map(GradleModule::as_android)
            .map(|m| (m.id(), m.clone()))
            .collect();
        let ordered: Vec<&AndroidModule> = modules
            .iter()
            .filter_map(GradleModule::as_android)
            .filter_map(|m| android_modules.get(&m.id()))
            .collect();

        let ctx = VariantContext { modules: &android_modules, cache: &cache, resolvers: &resolvers };
        let (resolution, classifier_options) = match &self.options {
            SyncOptions::SingleVariant(options) => (
                choose_selected_variants(ctx, &ordered, options, &self.flags, variant_runner, sequential)?,
                options.classifier_artifacts.clone(),
            ),
            SyncOptions::AllVariants(options) => (
                sync_all_variants(ctx, &ordered, variant_runner, sequential)?,
                options.classifier_artifacts.clone(),
            ),
            SyncOptions::NativeVariants(_) => (VariantResolution::default(), AdditionalClassifierArtifactsOptions::default()),
        };
        let mut outcomes = resolution.outcomes;

        let coordinates: Vec<_> = ordered
            .iter()
            .map(|module| {
                let outcome = outcomes.get(&module.id());
                let variants = outcome
                    .into_iter()
                    .flat_map(|o| o.synced_variant.iter().chain(o.all_variants.iter().flatten()));
                (module.identifier(), library_coordinates(variants, &classifier_options))
            })
            .collect();
        let mut classifier_artifacts =
            fetch_additional_classifier_artifacts(maybe_parallel, &coordinates, &classifier_options)?.into_iter();

        // Must stay the last Android model request of the pass
        let issue_requests: Vec<IssueRequest<'_>> = ordered
            .iter()
            .map(|module| IssueRequest {
                project: module.identifier(),
                use_v2: self.flags.use_v2_builder_models && can_fetch_v2_models(module.agp_version.as_ref()),
            })
            .collect();
        let mut fetched_issues = fetch_sync_issues(variant_runner, &cache, &issue_requests)?.into_iter();
        debug!("Interned {} libraries", cache.library_count());

        let mut deliveries = Vec::with_capacity(modules.len());
        for module in modules {
            match module {
                GradleModule::Android(module) => {
                    let outcome = outcomes.remove(&module.id()).unwrap_or_default();
                    let sync_issues = merge_sync_issues(
                        module.base_sync_issues.clone(),
                        fetched_issues.next().flatten(),
                        &outcome.unresolved_dependencies,
                        outcome.native_abi_error.as_deref(),
                    );
                    for dependency in &outcome.unresolved_dependencies {
                        debug!("Unresolved dependency {} in {}", dependency.name, module.id());
                    }
                    let synced = SyncedAndroidModule {
                        module_id: module.id(),
                        agp_version: module.android_project.agp_version.clone(),
                        project: module.project.clone(),
                        android_project: module.android_project,
                        all_variant_names: module.all_variant_names,
                        default_variant_name: module.default_variant_name,
                        native_android_project: module.native_android_project,
                        native_module: module.native_module,
                        synced_variant: outcome.synced_variant,
                        all_variants: outcome.all_variants,
                        synced_native_variant: outcome.synced_native_variant,
                        synced_native_variant_abi_name: outcome.synced_native_variant_abi_name,
                        native_abi_error: outcome.native_abi_error,
                        kotlin_gradle_model: outcome.kotlin_gradle_model,
                        kapt_gradle_model: outcome.kapt_gradle_model,
                        additional_classifier_artifacts: classifier_artifacts.next().flatten(),
                        unresolved_dependencies: outcome.unresolved_dependencies,
                        sync_issues,
                    };
                    deliveries.push(Delivery {
                        target: DeliveryTarget::Project(module.project.identifier),
                        model: DeliveredModel::AndroidModule(Box::new(synced)),
                    });
                }
                GradleModule::Java(module) => deliveries.push(Delivery {
                    target: DeliveryTarget::Project(module.project.identifier.clone()),
                    model: DeliveredModel::JavaModule(module),
                }),
            }
        }
        Ok(deliveries)
    }

    fn fetch_native_variants_modules(
        &self,
        maybe_parallel: &ActionRunner<'_>,
        sequential: &ActionRunner<'_>,
        options: &NativeVariantsSyncOptions,
    ) -> Result<Vec<NativeVariantsAndroidModule>> {
        let cache = ModelCache::new();
        let requested_abis: Vec<String> = options.requested_abis.iter().cloned().collect();
        let actions: Vec<FetchAction<'_, Option<NativeVariantsAndroidModule>>> = self
            .projects()
            .map(|project| {
                let cache = &cache;
                let requested_abis = &requested_abis;
                action(move |controller| {
                    let Some(variant) = options.module_variants.get(&project.id()) else {
                        return Ok(None);
                    };
                    let target = Target::Project(&project.identifier);

                    let v2_request = ModelRequest::NativeModule {
                        variants: Some(vec![variant.clone()]),
                        abis: Some(requested_abis.clone()),
                    };
                    let native_variants = if controller.find_native_module(target, &v2_request)?.is_some() {
                        NativeVariants::V2
                    } else {
                        let mut variant_abis = Vec::new();
                        for abi in requested_abis {
                            let request = ModelRequest::NativeVariantAbi { variant: variant.clone(), abi: abi.clone() };
                            if let Some(model) = controller.find_native_variant_abi(target, &request)? {
                                variant_abis.push(cache.native_variant_abi_from(&model));
                            }
                        }
                        NativeVariants::V1 { variant_abis }
                    };
                    Ok(Some(NativeVariantsAndroidModule { project: project.clone(), native_variants, sync_issues: Vec::new() }))
                })
            })
            .collect();
        let mut modules: Vec<NativeVariantsAndroidModule> = maybe_parallel.run_actions(actions)?.into_iter().flatten().collect();

        let requests: Vec<IssueRequest<'_>> = modules
            .iter()
            .map(|module| IssueRequest { project: &module.project.identifier, use_v2: false })
            .collect();
        let fetched = fetch_sync_issues(sequential, &cache, &requests)?;
        for (module, issues) in modules.iter_mut().zip(fetched) {
            module.sync_issues = merge_sync_issues(None, issues, &[], None);
        }
        info!("Generated native build information for {} module(s)", modules.len());
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;
    use crate::fixture::{BuildFixture, FixtureController, FixtureProject};
    use crate::model::{TYPE_EXTERNAL_NATIVE_BUILD_CONFIGURATION, TYPE_UNRESOLVED_DEPENDENCY};
    use crate::options::{AllVariantsSyncOptions, SingleVariantSyncOptions};
    use crate::protocol::{v1, AndroidProjectType, IdeaProject, ProjectIdentifier};
    use crate::selection::{SelectedVariant, SelectedVariants, VariantDetails};
    use std::collections::BTreeSet;

    const ROOT: &str = "/work/shop";

    fn id(path: &str) -> String {
        format!("{}{}", ROOT, path)
    }

    fn gradle_project(path: &str) -> BasicGradleProject {
        BasicGradleProject { name: path.trim_start_matches(':').into(), identifier: ProjectIdentifier::new(ROOT, path) }
    }

    fn basic_variant(name: &str, build_type: &str, flavor: &str) -> v2::BasicVariant {
        v2::BasicVariant { name: name.into(), build_type: Some(build_type.into()), product_flavors: vec![flavor.into()] }
    }

    const VARIANTS: [(&str, &str, &str); 4] = [
        ("freeDebug", "debug", "free"),
        ("fullDebug", "debug", "full"),
        ("freeRelease", "release", "free"),
        ("fullRelease", "release", "full"),
    ];

    /// V2 module with the four tier variants; `depends_on` edges carry
    /// build type and flavors only
    fn v2_project(agp: &str, project_type: AndroidProjectType, depends_on: &[&str]) -> FixtureProject {
        let mut project = FixtureProject {
            versions: Some(v2::Versions { agp: agp.into(), model_version: None }),
            basic_android_project: Some(v2::BasicAndroidProject {
                build_name: "shop".into(),
                project_type,
                variants: VARIANTS.iter().map(|(n, b, f)| basic_variant(n, b, f)).collect(),
            }),
            v2_android_project: Some(v2::AndroidProject {
                namespace: None,
                variants: VARIANTS
                    .iter()
                    .map(|(n, _, _)| v2::Variant {
                        name: n.to_string(),
                        display_name: None,
                        has_unit_test: false,
                        has_android_test: false,
                        has_test_fixtures: false,
                    })
                    .collect(),
                dynamic_features: Vec::new(),
            }),
            android_dsl: Some(v2::AndroidDsl {
                flavor_dimensions: vec!["tier".into()],
                build_types: vec![
                    v2::BuildTypeDsl { name: "debug".into(), is_default: None },
                    v2::BuildTypeDsl { name: "release".into(), is_default: None },
                ],
                product_flavors: vec![
                    v2::ProductFlavorDsl { name: "free".into(), dimension: Some("tier".into()), is_default: None },
                    v2::ProductFlavorDsl { name: "full".into(), dimension: Some("tier".into()), is_default: None },
                ],
                ndk_version: None,
            }),
            v2_sync_issues: Some(v2::ProjectSyncIssues::default()),
            ..FixtureProject::default()
        };
        for (name, build_type, flavor) in VARIANTS {
            let libraries = depends_on
                .iter()
                .map(|path| {
                    (
                        path.to_string(),
                        v2::Library::Project(v2::ProjectInfo {
                            build_id: "shop".into(),
                            project_path: path.to_string(),
                            build_type: Some(build_type.into()),
                            product_flavors: BTreeMap::from([("tier".to_string(), flavor.to_string())]),
                            is_test_fixtures: false,
                        }),
                    )
                })
                .chain([(
                    "okio".to_string(),
                    v2::Library::External {
                        artifact_address: "com.squareup.okio:okio:3.3.0".into(),
                        kind: v1::LibraryKind::Java,
                        artifact: None,
                    },
                )])
                .collect();
            let graph = depends_on
                .iter()
                .map(|path| v2::GraphItem { key: path.to_string(), dependencies: Vec::new() })
                .chain([v2::GraphItem { key: "okio".into(), dependencies: Vec::new() }])
                .collect();
            project.variant_dependencies.insert(
                name.to_string(),
                v2::VariantDependencies {
                    name: name.into(),
                    main_artifact: v2::ArtifactDependencies { compile_dependencies: graph, unresolved_dependencies: Vec::new() },
                    unit_test_artifact: None,
                    android_test_artifact: None,
                    test_fixtures_artifact: None,
                    libraries,
                },
            );
        }
        project
    }

    fn shop(agp: &str) -> BuildFixture {
        BuildFixture {
            builds: vec![GradleBuild {
                name: "shop".into(),
                root_dir: ROOT.into(),
                projects: vec![gradle_project(":"), gradle_project(":app"), gradle_project(":lib")],
            }],
            idea_project: Some(IdeaProject { name: "shop".into(), jdk_name: None, language_level: None }),
            build_maps: BTreeMap::from([(
                PathBuf::from(ROOT),
                crate::protocol::BuildMap { build_id_map: BTreeMap::from([("shop".to_string(), PathBuf::from(ROOT))]) },
            )]),
            projects: BTreeMap::from([
                (id(":app"), v2_project(agp, AndroidProjectType::App, &[":lib"])),
                (id(":lib"), v2_project(agp, AndroidProjectType::Library, &[])),
            ]),
            latency_ms: 0,
        }
    }

    fn run(controller: &FixtureController, options: SyncOptions) -> Vec<Delivery> {
        let worker = ModelProviderWorker::new(controller, &AppConfig::default(), options, controller.builds().to_vec());
        let mut deliveries = Vec::new();
        worker.populate_build_models(&mut deliveries);
        deliveries
    }

    fn android<'a>(deliveries: &'a [Delivery], path: &str) -> &'a SyncedAndroidModule {
        deliveries
            .iter()
            .find_map(|d| match &d.model {
                DeliveredModel::AndroidModule(m) if m.module_id == id(path) => Some(m.as_ref()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_v2_sync_delivers_every_module() {
        let controller = FixtureController::new(shop("8.0.2"));
        let deliveries = run(&controller, SyncOptions::default());

        assert_eq!(deliveries[0].model.model_name(), "IdeaProject");
        // root project is not an Android project
        assert!(matches!(deliveries.last().map(|d| &d.model), Some(DeliveredModel::JavaModule(_))));

        let app = android(&deliveries, ":app");
        let lib = android(&deliveries, ":lib");
        assert_eq!(app.synced_variant.as_ref().map(|v| v.name.as_str()), Some("freeDebug"));
        assert_eq!(lib.synced_variant.as_ref().map(|v| v.name.as_str()), Some("freeDebug"));
        let edge = &app.synced_variant.as_ref().unwrap().main_artifact.module_dependencies[0];
        assert_eq!(edge.variant.as_deref(), Some("freeDebug"));
        assert!(app.default_variant_name.as_ref().map_or(true, |d| app.all_variant_names.contains(d)));
    }

    #[test]
    fn test_switched_app_variant_reaches_library() {
        let controller = FixtureController::new(shop("8.0.2"));
        let details = |name: &str, flavor: &str| VariantDetails {
            name: name.into(),
            build_type: Some("debug".into()),
            flavors: vec![("tier".into(), flavor.into())],
            abi: None,
        };
        let options = SyncOptions::SingleVariant(SingleVariantSyncOptions {
            selected_variants: SelectedVariants::new([
                SelectedVariant { module_id: id(":app"), variant_name: "fullDebug".into(), abi_name: None, details: Some(details("freeDebug", "free")) },
                SelectedVariant { module_id: id(":lib"), variant_name: "freeDebug".into(), abi_name: None, details: Some(details("freeDebug", "free")) },
            ]),
            module_id_with_variant_switched: Some(id(":app")),
            ..SingleVariantSyncOptions::default()
        });

        let deliveries = run(&controller, options);
        assert_eq!(android(&deliveries, ":app").synced_variant.as_ref().unwrap().name, "fullDebug");
        assert_eq!(android(&deliveries, ":lib").synced_variant.as_ref().unwrap().name, "fullDebug");
    }

    #[test]
    fn test_edge_to_unknown_project_is_reported_on_the_module() {
        let mut fixture = shop("8.0.2");
        if let Some(app) = fixture.projects.get_mut(&id(":app")) {
            for dependencies in app.variant_dependencies.values_mut() {
                dependencies.libraries.insert(
                    "ghost".into(),
                    v2::Library::Project(v2::ProjectInfo {
                        build_id: "shop".into(),
                        project_path: ":ghost".into(),
                        build_type: Some("debug".into()),
                        product_flavors: BTreeMap::new(),
                        is_test_fixtures: false,
                    }),
                );
                dependencies.main_artifact.compile_dependencies.push(v2::GraphItem { key: "ghost".into(), dependencies: Vec::new() });
            }
        }
        let controller = FixtureController::new(fixture);
        let deliveries = run(&controller, SyncOptions::default());

        assert!(!deliveries.iter().any(|d| matches!(d.model, DeliveredModel::SyncError(_))));
        let app = android(&deliveries, ":app");
        assert_eq!(app.synced_variant.as_ref().map(|v| v.name.as_str()), Some("freeDebug"));
        assert!(app.unresolved_dependencies.iter().any(|d| d.name == "shop:ghost"));
        assert!(app
            .sync_issues
            .iter()
            .any(|i| i.issue_type == TYPE_UNRESOLVED_DEPENDENCY && i.data.as_deref() == Some("shop:ghost")));
        assert!(android(&deliveries, ":lib").synced_variant.is_some());
    }

    #[test]
    fn test_too_old_plugin_delivers_only_the_error() {
        let controller = FixtureController::new(shop("3.0.1"));
        let deliveries = run(&controller, SyncOptions::default());

        assert_eq!(deliveries.len(), 1);
        let DeliveredModel::SyncError(error) = &deliveries[0].model else { panic!("expected a sync error") };
        assert_eq!(error.kind, SyncErrorKind::AgpVersionTooOld);
        assert_eq!(error.agp_version.as_deref(), Some("3.0.1"));
    }

    #[test]
    fn test_fetch_failure_becomes_generic_error() {
        let mut fixture = shop("8.0.2");
        if let Some(lib) = fixture.projects.get_mut(&id(":lib")) {
            lib.failures.insert("VariantDependencies".into(), "out of memory".into());
        }
        let controller = FixtureController::new(fixture);
        let deliveries = run(&controller, SyncOptions::default());

        assert_eq!(deliveries.len(), 1);
        let DeliveredModel::SyncError(error) = &deliveries[0].model else { panic!("expected a sync error") };
        assert_eq!(error.kind, SyncErrorKind::Generic);
        assert!(error.causes.iter().any(|c| c.contains("out of memory")));
    }

    #[test]
    fn test_parallel_gate_follows_oldest_plugin() {
        // 7.2 speaks V2 but cannot be fetched in parallel
        let controller = FixtureController::new(shop("7.2.0"));
        let deliveries = run(&controller, SyncOptions::default());
        assert!(android(&deliveries, ":app").synced_variant.is_some());

        let config = AppConfig::default();
        let worker = ModelProviderWorker::new(&controller, &config, SyncOptions::default(), controller.builds().to_vec());
        let checker = CompatibilityChecker::new(&config.agp, false).unwrap();
        let runner = ActionRunner::sequential(&controller);
        let probed = worker.basic_incomplete_modules(&checker, &runner).unwrap();
        assert_eq!(probed.iter().filter(|m| matches!(m, BasicIncompleteGradleModule::V2 { .. })).count(), 2);
        assert!(!probed.iter().any(|m| match m {
            BasicIncompleteGradleModule::V2 { versions, .. } => can_use_parallel_sync(AgpVersion::try_parse(&versions.agp).as_ref()),
            BasicIncompleteGradleModule::NonV2 { .. } => false,
        }));
    }

    #[test]
    fn test_all_variants_mode_fetches_every_variant() {
        let controller = FixtureController::new(shop("8.0.2"));
        let deliveries = run(&controller, SyncOptions::AllVariants(AllVariantsSyncOptions::default()));

        let lib = android(&deliveries, ":lib");
        assert!(lib.synced_variant.is_none());
        assert_eq!(lib.all_variants.as_ref().map(Vec::len), Some(4));
        assert_eq!(controller.requests_for("VariantDependencies").len(), 8);
    }

    fn v1_native_fixture(abis: &[&str]) -> BuildFixture {
        let project = FixtureProject {
            android_project: Some(v1::AndroidProject {
                name: "native".into(),
                model_version: Some("4.2.2".into()),
                project_type: AndroidProjectType::App,
                variant_names: Some(vec!["debug".into()]),
                default_variant: None,
                flavor_dimensions: Vec::new(),
                build_types: vec!["debug".into()],
                product_flavors: Vec::new(),
                dynamic_features: Vec::new(),
                sync_issues: None,
                ndk_version: None,
            }),
            native_android_project: Some(v1::NativeAndroidProject {
                name: "native".into(),
                variant_infos: BTreeMap::from([(
                    "debug".to_string(),
                    v1::NativeVariantInfo { abi_names: abis.iter().map(|a| a.to_string()).collect() },
                )]),
                ndk_version: Some("25.2.9519653".into()),
            }),
            variants: BTreeMap::from([(
                "debug".to_string(),
                v1::Variant {
                    name: "debug".into(),
                    display_name: None,
                    build_type: Some("debug".into()),
                    product_flavors: Vec::new(),
                    main_artifact: v1::Artifact::default(),
                    unit_test_artifact: None,
                    android_test_artifact: None,
                    test_fixtures_artifact: None,
                },
            )]),
            native_variant_abis: abis
                .iter()
                .map(|abi| v1::NativeVariantAbi { variant_name: "debug".into(), abi: abi.to_string(), build_files: Vec::new() })
                .collect(),
            sync_issues: Some(v1::ProjectSyncIssues::default()),
            unsupported: BTreeSet::from(["Versions".to_string(), "NativeModule".to_string()]),
            ..FixtureProject::default()
        };
        BuildFixture {
            builds: vec![GradleBuild { name: "native".into(), root_dir: ROOT.into(), projects: vec![gradle_project(":native")] }],
            projects: BTreeMap::from([(id(":native"), project)]),
            ..BuildFixture::default()
        }
    }

    #[test]
    fn test_v1_native_module_prefers_x86() {
        let controller = FixtureController::new(v1_native_fixture(&["x86", "arm64-v8a"]));
        let deliveries = run(&controller, SyncOptions::default());

        let native = android(&deliveries, ":native");
        assert_eq!(native.synced_native_variant_abi_name.as_deref(), Some("x86"));
        assert_eq!(native.synced_native_variant.as_ref().map(|v| v.abi.as_str()), Some("x86"));
        assert!(native.native_abi_error.is_none());
    }

    #[test]
    fn test_native_module_without_abi_is_reported_not_fatal() {
        let controller = FixtureController::new(v1_native_fixture(&[]));
        let deliveries = run(&controller, SyncOptions::default());

        let native = android(&deliveries, ":native");
        assert!(native.synced_variant.is_some());
        assert!(native.native_abi_error.is_some());
        assert!(native.sync_issues.iter().any(|i| i.issue_type == TYPE_EXTERNAL_NATIVE_BUILD_CONFIGURATION));
    }

    #[test]
    fn test_all_variants_mode_reports_missing_abi() {
        let controller = FixtureController::new(v1_native_fixture(&[]));
        let deliveries = run(&controller, SyncOptions::AllVariants(AllVariantsSyncOptions::default()));

        let native = android(&deliveries, ":native");
        assert_eq!(native.all_variants.as_ref().map(Vec::len), Some(1));
        assert!(native.native_abi_error.is_some());
        assert!(native.sync_issues.iter().any(|i| i.issue_type == TYPE_EXTERNAL_NATIVE_BUILD_CONFIGURATION));
    }

    #[test]
    fn test_native_variants_mode_falls_back_to_v1() {
        let controller = FixtureController::new(v1_native_fixture(&["x86", "arm64-v8a"]));
        let options = SyncOptions::NativeVariants(NativeVariantsSyncOptions {
            module_variants: HashMap::from([(id(":native"), "debug".to_string())]),
            requested_abis: BTreeSet::from(["arm64-v8a".to_string(), "x86".to_string()]),
        });
        let deliveries = run(&controller, options);

        // no IdeaProject in this fixture, so only the module is delivered
        assert_eq!(deliveries.len(), 1);
        let DeliveredModel::NativeVariantsModule(module) = &deliveries[0].model else { panic!("expected a native module") };
        let NativeVariants::V1 { variant_abis } = &module.native_variants else { panic!("expected V1 models") };
        assert_eq!(variant_abis.len(), 2);
        assert!(controller.requests_for("Variant").is_empty());
    }
}
