use fcx_engineering::ComputeFailure;
use fcx_schemas::{CacheSnapshot, Dataset, FeatureCombination};
use std::fmt;

/// Which policy a pass applied, decided by the prior cache state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileBranch {
    /// No cached datasets (even if combinations were listed): retain what is
    /// still required, add fresh work, dedupe with last write winning.
    CacheEmpty,
    /// Cached datasets exist: serve and persist only the fresh work.
    CachePresent,
}

impl ReconcileBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileBranch::CacheEmpty => "CACHE_EMPTY",
            ReconcileBranch::CachePresent => "CACHE_PRESENT",
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileReport {
    pub branch: ReconcileBranch,
    /// Required combinations missing from the cache, in required order.
    pub new_work: Vec<FeatureCombination>,
    /// Cached entries kept because they are still required (CacheEmpty only).
    pub retained: usize,
    /// Combinations the adapter could not compute.
    pub failures: Vec<ComputeFailure>,
    /// What the caller gets back; also what was written to disk.
    pub served: CacheSnapshot,
    pub persisted: bool,
    /// Set when the pass failed and served nothing.
    pub degraded: Option<String>,
}

impl ReconcileReport {
    pub(crate) fn degraded(branch: ReconcileBranch, new_work: Vec<FeatureCombination>, reason: String) -> Self {
        Self {
            branch,
            new_work,
            retained: 0,
            failures: Vec::new(),
            served: CacheSnapshot::empty(),
            persisted: false,
            degraded: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Served `(combinations, datasets)` lists.
    pub fn served_pair(&self) -> (&[FeatureCombination], &[Dataset]) {
        (&self.served.combinations, &self.served.datasets)
    }

    /// Served dataset for `combination`, if any.
    pub fn dataset_for(&self, combination: &FeatureCombination) -> Option<&Dataset> {
        self.served
            .entries()
            .find(|(c, _)| *c == combination)
            .map(|(_, d)| d)
    }
}

/// Failures that abort a pass (and degrade it to serving nothing).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// The adapter returned a different number of outcomes than requested.
    BatchSize { requested: usize, returned: usize },
    /// Outcome `index` names a different combination than was requested there.
    BatchOrder {
        index: usize,
        expected: FeatureCombination,
        got: FeatureCombination,
    },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::BatchSize {
                requested,
                returned,
            } => write!(
                f,
                "adapter returned {returned} outcome(s) for {requested} requested combination(s)"
            ),
            ReconcileError::BatchOrder {
                index,
                expected,
                got,
            } => write!(
                f,
                "adapter outcome #{index} is for {got}, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for ReconcileError {}
