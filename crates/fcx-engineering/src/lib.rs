//! fcx-engineering
//!
//! Capability boundary for computing one dataset per feature combination.
//!
//! The reconcile engine only sees [`EngineeringAdapter`]. An adapter computes
//! a single combination at a time; the provided [`EngineeringAdapter::compute`]
//! runs a batch, turning every per-combination error into an explicit
//! [`ComputeOutcome::Failed`] so one bad combination never aborts the batch.
//!
//! Adapters that need a time window and configuration receive them through
//! an optional [`EngineeringContext`]; adapters that do not simply ignore it.

pub mod normalize;
pub mod table;

pub use normalize::min_max_normalize;
pub use table::{SourceError, SourceTable, TableAdapter};

use chrono::NaiveDate;
use fcx_schemas::{CacheSnapshot, Dataset, FeatureCombination, ParameterPeriod};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Configuration and inclusive date window forwarded to parameterized adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeringContext {
    pub config: Value,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EngineeringContext {
    pub fn new(config: Value, start: NaiveDate, end: NaiveDate) -> Result<Self, EngineeringError> {
        if start > end {
            return Err(EngineeringError::InvalidWindow { start, end });
        }
        Ok(Self { config, start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EngineeringError {
    /// A parameterized adapter was called without a context.
    MissingContext,
    /// `start` is after `end`.
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    /// No source column backs this token.
    UnknownFeature(String),
    /// The window kept fewer rows than required.
    InsufficientRows { got: usize, min: usize },
    /// The computed matrix is not rectangular.
    Shape(String),
    /// Adapter-specific failure.
    Compute(String),
}

impl fmt::Display for EngineeringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineeringError::MissingContext => {
                write!(f, "adapter requires a context (config + window) but none was given")
            }
            EngineeringError::InvalidWindow { start, end } => {
                write!(f, "invalid window: start {start} is after end {end}")
            }
            EngineeringError::UnknownFeature(t) => write!(f, "unknown feature token '{t}'"),
            EngineeringError::InsufficientRows { got, min } => {
                write!(f, "window holds {got} row(s), need at least {min}")
            }
            EngineeringError::Shape(msg) => write!(f, "dataset shape error: {msg}"),
            EngineeringError::Compute(msg) => write!(f, "compute error: {msg}"),
        }
    }
}

impl std::error::Error for EngineeringError {}

// ---------------------------------------------------------------------------
// Per-item outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeFailure {
    pub combination: FeatureCombination,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeOutcome {
    Computed {
        combination: FeatureCombination,
        dataset: Dataset,
    },
    Failed(ComputeFailure),
}

impl ComputeOutcome {
    pub fn combination(&self) -> &FeatureCombination {
        match self {
            ComputeOutcome::Computed { combination, .. } => combination,
            ComputeOutcome::Failed(f) => &f.combination,
        }
    }
}

/// Outcomes of one batch, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineeringBatch {
    outcomes: Vec<ComputeOutcome>,
}

impl EngineeringBatch {
    pub fn new(outcomes: Vec<ComputeOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[ComputeOutcome] {
        &self.outcomes
    }

    pub fn served_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ComputeOutcome::Computed { .. }))
            .count()
    }

    pub fn failures(&self) -> Vec<&ComputeFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ComputeOutcome::Failed(f) => Some(f),
                ComputeOutcome::Computed { .. } => None,
            })
            .collect()
    }

    /// Split into the served `(combinations, datasets)` pair and the failures.
    ///
    /// The served pair is aligned by construction; it may be shorter than the
    /// request.
    pub fn into_parts(self) -> (CacheSnapshot, Vec<ComputeFailure>) {
        let mut served = CacheSnapshot::empty();
        let mut failures = Vec::new();
        for o in self.outcomes {
            match o {
                ComputeOutcome::Computed {
                    combination,
                    dataset,
                } => {
                    served.combinations.push(combination);
                    served.datasets.push(dataset);
                }
                ComputeOutcome::Failed(f) => failures.push(f),
            }
        }
        (served, failures)
    }
}

// ---------------------------------------------------------------------------
// Adapter trait
// ---------------------------------------------------------------------------

/// Computes the dataset for a feature combination.
pub trait EngineeringAdapter {
    /// Short identifier used in logs (e.g. `"table"`).
    fn name(&self) -> &'static str;

    fn compute_one(
        &self,
        combination: &FeatureCombination,
        period: ParameterPeriod,
        ctx: Option<&EngineeringContext>,
    ) -> Result<Dataset, EngineeringError>;

    /// Compute every combination, skipping (and recording) the ones that fail.
    fn compute(
        &self,
        combinations: &[FeatureCombination],
        period: ParameterPeriod,
        ctx: Option<&EngineeringContext>,
    ) -> EngineeringBatch {
        let mut outcomes = Vec::with_capacity(combinations.len());
        for combination in combinations {
            match self.compute_one(combination, period, ctx) {
                Ok(dataset) => {
                    debug!(
                        adapter = self.name(),
                        combination = %combination,
                        rows = dataset.n_rows(),
                        cols = dataset.n_cols(),
                        "combination computed"
                    );
                    outcomes.push(ComputeOutcome::Computed {
                        combination: combination.clone(),
                        dataset,
                    });
                }
                Err(e) => {
                    warn!(
                        adapter = self.name(),
                        combination = %combination,
                        error = %e,
                        "combination failed; skipping"
                    );
                    outcomes.push(ComputeOutcome::Failed(ComputeFailure {
                        combination: combination.clone(),
                        reason: e.to_string(),
                    }));
                }
            }
        }
        EngineeringBatch::new(outcomes)
    }
}
