//! Sync issue aggregation
//!
//! Runs after every other Android model request of the pass, since those
//! requests can themselves produce issues.

use tracing::debug;

use crate::controller::{ControllerExt, ModelRequest, Target};
use crate::error::Result;
use crate::model::{IdeSyncIssue, IdeUnresolvedDependency, SEVERITY_ERROR, TYPE_EXTERNAL_NATIVE_BUILD_CONFIGURATION};
use crate::model_cache::ModelCache;
use crate::protocol::ProjectIdentifier;
use crate::runner::{action, ActionRunner};

/// Issues model request for one module
#[derive(Debug, Clone, Copy)]
pub struct IssueRequest<'a> {
    pub project: &'a ProjectIdentifier,
    /// Request the V2 model; otherwise the V1 one
    pub use_v2: bool,
}

/// Fetches the issues model of every module, `None` where the build
/// has none
pub fn fetch_sync_issues(
    runner: &ActionRunner<'_>,
    cache: &ModelCache,
    requests: &[IssueRequest<'_>],
) -> Result<Vec<Option<Vec<IdeSyncIssue>>>> {
    let actions = requests
        .iter()
        .copied()
        .map(|request| {
            action(move |controller| {
                let target = Target::Project(request.project);
                if request.use_v2 {
                    Ok(controller
                        .find_v2_sync_issues(target, &ModelRequest::V2ProjectSyncIssues)?
                        .map(|model| cache.sync_issues_from_v2(&model.sync_issues)))
                } else {
                    Ok(controller
                        .find_v1_sync_issues(target, &ModelRequest::ProjectSyncIssues)?
                        .map(|model| cache.sync_issues_from_v1(&model.sync_issues)))
                }
            })
        })
        .collect();
    runner.run_actions(actions)
}

/// Final issue list of a module. A fetched issues model replaces the
/// issues carried by the base model. Unresolved dependencies and a
/// failed native ABI choice are always reported.
pub fn merge_sync_issues(
    existing: Option<Vec<IdeSyncIssue>>,
    fetched: Option<Vec<IdeSyncIssue>>,
    unresolved: &[IdeUnresolvedDependency],
    native_abi_error: Option<&str>,
) -> Vec<IdeSyncIssue> {
    if fetched.is_none() && existing.is_some() {
        debug!("No sync issues model, keeping the issues of the base model");
    }
    let mut issues = fetched.or(existing).unwrap_or_default();
    issues.extend(unresolved.iter().map(IdeSyncIssue::unresolved_dependency));
    if let Some(error) = native_abi_error {
        issues.push(IdeSyncIssue {
            message: error.to_string(),
            data: None,
            multi_line_message: None,
            severity: SEVERITY_ERROR,
            issue_type: TYPE_EXTERNAL_NATIVE_BUILD_CONFIGURATION,
        });
    }
    issues
}
