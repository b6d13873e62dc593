//! Action Runner
//!
//! Runs batches of fetch actions against the build controller. The
//! sequential runner executes them one by one on the calling thread; the
//! parallel runner spreads them over a bounded rayon pool. Either way the
//! results come back in input order, and the first fatal error aborts
//! the batch.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use crate::controller::BuildController;
use crate::error::{Result, SyncError};

/// One unit of work for a runner
pub type FetchAction<'a, T> = Box<dyn FnOnce(&dyn BuildController) -> Result<T> + Send + 'a>;

/// Boxes a closure as a [`FetchAction`]
pub fn action<'a, T, F>(f: F) -> FetchAction<'a, T>
where
    F: FnOnce(&dyn BuildController) -> Result<T> + Send + 'a,
{
    Box::new(f)
}

#[derive(Clone)]
pub struct ActionRunner<'c> {
    controller: &'c dyn BuildController,
    pool: Option<Arc<ThreadPool>>,
}

impl<'c> ActionRunner<'c> {
    pub fn sequential(controller: &'c dyn BuildController) -> Self {
        Self { controller, pool: None }
    }

    /// Parallel runner over `threads` workers. A single thread degrades to
    /// the sequential runner.
    pub fn maybe_parallel(controller: &'c dyn BuildController, threads: usize) -> Result<Self> {
        if threads <= 1 {
            return Ok(Self::sequential(controller));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gradle-sync-{}", i))
            .build()
            .map_err(|e| SyncError::ThreadPool(e.to_string()))?;
        debug!("Parallel model fetching with {} threads", threads);
        Ok(Self { controller, pool: Some(Arc::new(pool)) })
    }

    pub fn parallel_actions_supported(&self) -> bool {
        self.pool.is_some()
    }

    pub fn run_action<T>(&self, action: impl FnOnce(&dyn BuildController) -> Result<T>) -> Result<T> {
        action(self.controller)
    }

    pub fn run_actions<'a, T: Send>(&self, actions: Vec<FetchAction<'a, T>>) -> Result<Vec<T>> {
        let controller = self.controller;
        match &self.pool {
            Some(pool) if actions.len() > 1 => {
                pool.install(|| actions.into_par_iter().map(|action| action(controller)).collect())
            }
            _ => actions.into_iter().map(|action| action(controller)).collect(),
        }
    }
}
