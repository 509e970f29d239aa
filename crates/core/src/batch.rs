//! Parallel batch execution
//!
//! Runs independent per-item operations on a fixed number of worker tasks,
//! always draining the whole input, and turns the collected outcomes into
//! either a report or a single aggregate failure.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinSet;

use crate::error::{BatchFailure, Error, ItemFailure, Result};
use crate::model::{FileDescriptor, SymLink};

/// Default ceiling on simultaneously in-flight requests per batch
pub const DEFAULT_CONCURRENCY: usize = 8;

/// What to do when some items of a batch fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Raise one aggregate error naming every failed item
    #[default]
    Strict,
    /// Return every outcome and leave triage to the caller
    BestEffort,
}

impl BatchMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            BatchMode::Strict
        } else {
            BatchMode::BestEffort
        }
    }
}

/// Something a batch can run an operation for
pub trait BatchItem {
    /// Identity used in reports and errors
    fn name(&self) -> &str;
}

impl BatchItem for FileDescriptor {
    fn name(&self) -> &str {
        self.server_name()
    }
}

impl BatchItem for SymLink {
    fn name(&self) -> &str {
        self.server_name()
    }
}

/// Observer notified after each item finishes
pub trait BatchProgress: Send + Sync {
    fn on_item(&self, name: &str, result: &Result<()>);
}

/// Outcome of one input item
#[derive(Debug)]
pub struct ItemOutcome {
    pub index: usize,
    pub name: String,
    pub result: Result<()>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-item outcomes of a batch, one entry per input item in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<ItemOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::is_success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// `Ok` if every item succeeded, otherwise the failed subset
    pub fn into_result(self) -> std::result::Result<BatchReport, BatchFailure> {
        if self.is_success() {
            return Ok(self);
        }

        let total = self.outcomes.len();
        let mut failures = Vec::new();
        let mut succeeded = Vec::new();
        for outcome in self.outcomes {
            match outcome.result {
                Ok(()) => succeeded.push(outcome.name),
                Err(error) => failures.push(ItemFailure {
                    index: outcome.index,
                    name: outcome.name,
                    error,
                }),
            }
        }
        Err(BatchFailure {
            total,
            failures,
            succeeded,
        })
    }
}

/// Bounded worker pool for one batch invocation at a time
#[derive(Clone)]
pub struct BatchExecutor {
    concurrency: usize,
    progress: Option<Arc<dyn BatchProgress>>,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl BatchExecutor {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn BatchProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn progress(&self) -> Option<Arc<dyn BatchProgress>> {
        self.progress.clone()
    }

    /// Run `op` for every item and apply `mode` to the outcomes
    ///
    /// Items are dealt round-robin onto `min(concurrency, n)` workers, each
    /// running its share sequentially. There is no ordering between items
    /// on different workers.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, mode: BatchMode, op: F) -> Result<BatchReport>
    where
        T: BatchItem + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return Ok(BatchReport::default());
        }

        let outcomes: Arc<DashMap<usize, ItemOutcome>> = Arc::new(DashMap::with_capacity(total));
        let op = Arc::new(op);

        let workers = self.concurrency.min(total);
        let mut lanes: Vec<Vec<(usize, T)>> = (0..workers).map(|_| Vec::new()).collect();
        for (index, item) in items.into_iter().enumerate() {
            lanes[index % workers].push((index, item));
        }

        let mut pool = JoinSet::new();
        for lane in lanes {
            pool.spawn(run_lane(
                lane,
                Arc::clone(&op),
                Arc::clone(&outcomes),
                self.progress.clone(),
            ));
        }
        while let Some(joined) = pool.join_next().await {
            joined.map_err(|e| Error::Pool(e.to_string()))?;
        }

        let mut collected = Vec::with_capacity(total);
        for index in 0..total {
            let (_, outcome) = outcomes
                .remove(&index)
                .ok_or_else(|| Error::Pool(format!("no outcome recorded for item {index}")))?;
            collected.push(outcome);
        }
        let report = BatchReport {
            outcomes: collected,
        };

        let failed = report.failed().count();
        tracing::info!(total, failed, "batch finished");

        match mode {
            BatchMode::Strict => report.into_result().map_err(Error::Batch),
            BatchMode::BestEffort => Ok(report),
        }
    }
}

async fn run_lane<T, F, Fut>(
    lane: Vec<(usize, T)>,
    op: Arc<F>,
    outcomes: Arc<DashMap<usize, ItemOutcome>>,
    progress: Option<Arc<dyn BatchProgress>>,
) where
    T: BatchItem,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    for (index, item) in lane {
        let name = item.name().to_string();
        let result = op(item).await;
        if let Err(e) = &result {
            tracing::warn!(item = %name, error = %e, "batch item failed");
        }
        if let Some(progress) = &progress {
            progress.on_item(&name, &result);
        }
        outcomes.insert(index, ItemOutcome {
            index,
            name,
            result,
        });
    }
}
