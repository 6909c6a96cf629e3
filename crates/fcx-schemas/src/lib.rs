//! fcx-schemas
//!
//! Shared value types for the feature cache: feature combinations, the
//! labeled numeric datasets computed for them, and the snapshot pairing the
//! two. No IO lives here.

mod dataset;

pub use dataset::{ColumnarDataset, Dataset, DatasetShapeError, StoredColumn};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Feature combination
// ---------------------------------------------------------------------------

/// An ordered sequence of feature tokens computed as one unit.
///
/// Equality is element-wise: `(a, b)` and `(b, a)` are different
/// combinations. The generator never reorders tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCombination(Vec<String>);

impl FeatureCombination {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Parse the comma-joined form (`"a,b"`) into a combination.
    ///
    /// Plain split on `,`: whitespace and empty pieces are kept as tokens.
    pub fn parse_joined(s: &str) -> Self {
        Self(s.split(',').map(str::to_string).collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form, the inverse of [`FeatureCombination::parse_joined`].
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for FeatureCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Full cache state: combinations and datasets, positionally aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub combinations: Vec<FeatureCombination>,
    pub datasets: Vec<Dataset>,
}

impl CacheSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(combinations: Vec<FeatureCombination>, datasets: Vec<Dataset>) -> Self {
        Self {
            combinations,
            datasets,
        }
    }

    /// Number of aligned entries (the shorter side if the snapshot is inconsistent).
    pub fn len(&self) -> usize {
        self.combinations.len().min(self.datasets.len())
    }

    /// True when there is nothing to serve: no combinations and no datasets.
    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty() && self.datasets.is_empty()
    }

    /// Equal lengths and no repeated combination key.
    pub fn is_consistent(&self) -> bool {
        if self.combinations.len() != self.datasets.len() {
            return false;
        }
        let mut seen = HashSet::with_capacity(self.combinations.len());
        self.combinations.iter().all(|c| seen.insert(c))
    }

    /// Aligned `(combination, dataset)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&FeatureCombination, &Dataset)> {
        self.combinations.iter().zip(self.datasets.iter())
    }

    pub fn into_pair(self) -> (Vec<FeatureCombination>, Vec<Dataset>) {
        (self.combinations, self.datasets)
    }
}

// ---------------------------------------------------------------------------
// Parameter period
// ---------------------------------------------------------------------------

/// Horizon the feature parameters are tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPeriod {
    #[default]
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl ParameterPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterPeriod::ShortTerm => "short_term",
            ParameterPeriod::MediumTerm => "medium_term",
            ParameterPeriod::LongTerm => "long_term",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short_term" | "short" => Some(ParameterPeriod::ShortTerm),
            "medium_term" | "medium" => Some(ParameterPeriod::MediumTerm),
            "long_term" | "long" => Some(ParameterPeriod::LongTerm),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
