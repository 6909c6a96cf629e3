use std::collections::{HashMap, HashSet};

use fcx_cache::CacheStore;
use fcx_engineering::{EngineeringAdapter, EngineeringBatch, EngineeringContext};
use fcx_schemas::{CacheSnapshot, Dataset, FeatureCombination, ParameterPeriod};
use tracing::{error, info};

use crate::{ReconcileBranch, ReconcileError, ReconcileReport};

/// Required combinations not present in `saved`, in `required` order.
///
/// `required` is not deduplicated: a repeated missing combination appears
/// repeatedly in the result.
pub fn diff_required(
    required: &[FeatureCombination],
    saved: &[FeatureCombination],
) -> Vec<FeatureCombination> {
    let saved: HashSet<&FeatureCombination> = saved.iter().collect();
    required
        .iter()
        .filter(|c| !saved.contains(c))
        .cloned()
        .collect()
}

/// Cached `(combination, dataset)` pairs whose combination is still required.
///
/// Pairs are taken positionally; combinations without a dataset (an
/// inconsistent snapshot) are dropped.
pub fn retain_required(
    saved: &CacheSnapshot,
    required: &[FeatureCombination],
) -> Vec<(FeatureCombination, Dataset)> {
    let required: HashSet<&FeatureCombination> = required.iter().collect();
    saved
        .entries()
        .filter(|(c, _)| required.contains(c))
        .map(|(c, d)| (c.clone(), d.clone()))
        .collect()
}

/// Dedupe by combination. A key keeps the position of its first occurrence
/// and the dataset of its last.
pub fn merge_last_write_wins<I>(entries: I) -> CacheSnapshot
where
    I: IntoIterator<Item = (FeatureCombination, Dataset)>,
{
    let mut out = CacheSnapshot::empty();
    let mut slot: HashMap<FeatureCombination, usize> = HashMap::new();

    for (combination, dataset) in entries {
        match slot.get(&combination) {
            Some(&i) => out.datasets[i] = dataset,
            None => {
                slot.insert(combination.clone(), out.combinations.len());
                out.combinations.push(combination);
                out.datasets.push(dataset);
            }
        }
    }
    out
}

fn check_batch(requested: &[FeatureCombination], batch: &EngineeringBatch) -> Result<(), ReconcileError> {
    let outcomes = batch.outcomes();
    if outcomes.len() != requested.len() {
        return Err(ReconcileError::BatchSize {
            requested: requested.len(),
            returned: outcomes.len(),
        });
    }
    for (index, (expected, outcome)) in requested.iter().zip(outcomes).enumerate() {
        if outcome.combination() != expected {
            return Err(ReconcileError::BatchOrder {
                index,
                expected: expected.clone(),
                got: outcome.combination().clone(),
            });
        }
    }
    Ok(())
}

/// Orchestrates one reconciliation pass against an explicit cache handle.
pub struct ReconciliationEngine<A> {
    store: CacheStore,
    adapter: A,
    period: ParameterPeriod,
}

impl<A: EngineeringAdapter> ReconciliationEngine<A> {
    pub fn new(store: CacheStore, adapter: A, period: ParameterPeriod) -> Self {
        Self {
            store,
            adapter,
            period,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn period(&self) -> ParameterPeriod {
        self.period
    }

    /// Load the snapshot from the store, then [`Self::reconcile`].
    pub fn run_pass(
        &self,
        required: &[FeatureCombination],
        ctx: Option<&EngineeringContext>,
    ) -> ReconcileReport {
        let saved = self.store.load();
        self.reconcile(saved, required, ctx)
    }

    /// Reconcile `saved` against `required`; never fails.
    ///
    /// On error the report carries empty served lists, `persisted == false`
    /// and the reason in `degraded`; `new_work` still lists what was missing.
    /// Nothing is written in that case.
    pub fn reconcile(
        &self,
        saved: CacheSnapshot,
        required: &[FeatureCombination],
        ctx: Option<&EngineeringContext>,
    ) -> ReconcileReport {
        let branch = branch_for(&saved);
        let new_work = diff_required(required, &saved.combinations);
        match self.reconcile_new_work(saved, required, new_work.clone(), ctx) {
            Ok(report) => report,
            Err(e) => {
                error!(
                    path = %self.store.path().display(),
                    adapter = self.adapter.name(),
                    branch = branch.as_str(),
                    new_work = new_work.len(),
                    error = %e,
                    "reconcile pass failed; serving nothing"
                );
                ReconcileReport::degraded(branch, new_work, e.to_string())
            }
        }
    }

    pub fn try_reconcile(
        &self,
        saved: CacheSnapshot,
        required: &[FeatureCombination],
        ctx: Option<&EngineeringContext>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let new_work = diff_required(required, &saved.combinations);
        self.reconcile_new_work(saved, required, new_work, ctx)
    }

    fn reconcile_new_work(
        &self,
        saved: CacheSnapshot,
        required: &[FeatureCombination],
        new_work: Vec<FeatureCombination>,
        ctx: Option<&EngineeringContext>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let branch = branch_for(&saved);

        let batch = self.adapter.compute(&new_work, self.period, ctx);
        check_batch(&new_work, &batch)?;
        let (fresh, failures) = batch.into_parts();

        let (served, retained) = match branch {
            ReconcileBranch::CacheEmpty => {
                let kept = retain_required(&saved, required);
                let retained = kept.len();
                let fresh_entries = fresh.combinations.into_iter().zip(fresh.datasets);
                (merge_last_write_wins(kept.into_iter().chain(fresh_entries)), retained)
            }
            // Prior cache is not merged back in.
            ReconcileBranch::CachePresent => (fresh, 0),
        };

        let persisted = self.store.save(&served);

        info!(
            path = %self.store.path().display(),
            adapter = self.adapter.name(),
            period = %self.period,
            branch = branch.as_str(),
            required = required.len(),
            new_work = new_work.len(),
            retained,
            failed = failures.len(),
            served = served.len(),
            persisted,
            "reconcile pass complete"
        );

        Ok(ReconcileReport {
            branch,
            new_work,
            retained,
            failures,
            served,
            persisted,
            degraded: None,
        })
    }
}

fn branch_for(saved: &CacheSnapshot) -> ReconcileBranch {
    if saved.datasets.is_empty() {
        ReconcileBranch::CacheEmpty
    } else {
        ReconcileBranch::CachePresent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(tokens: &[&str]) -> FeatureCombination {
        FeatureCombination::from_tokens(tokens.iter().copied())
    }

    fn tagged(tag: f64) -> Dataset {
        Dataset::new(vec!["tag".to_string()], vec![vec![tag]]).unwrap()
    }

    #[test]
    fn diff_preserves_required_order_and_repeats() {
        let required = vec![combo(&["c"]), combo(&["a"]), combo(&["b"]), combo(&["c"])];
        let saved = vec![combo(&["a"])];
        assert_eq!(
            diff_required(&required, &saved),
            vec![combo(&["c"]), combo(&["b"]), combo(&["c"])]
        );
    }

    #[test]
    fn diff_is_order_sensitive_within_combination() {
        let required = vec![combo(&["a", "b"])];
        let saved = vec![combo(&["b", "a"])];
        assert_eq!(diff_required(&required, &saved), required);
    }

    #[test]
    fn retain_drops_stale_and_unpaired_entries() {
        let saved = CacheSnapshot::new(
            vec![combo(&["a"]), combo(&["stale"]), combo(&["b"])],
            vec![tagged(1.0), tagged(2.0)],
        );
        let kept = retain_required(&saved, &[combo(&["a"]), combo(&["b"])]);
        // (b) has no dataset in this snapshot, so it cannot be retained.
        assert_eq!(kept, vec![(combo(&["a"]), tagged(1.0))]);
    }

    #[test]
    fn merge_keeps_first_position_and_last_value() {
        let merged = merge_last_write_wins(vec![
            (combo(&["a"]), tagged(1.0)),
            (combo(&["b"]), tagged(2.0)),
            (combo(&["a"]), tagged(3.0)),
        ]);
        assert_eq!(merged.combinations, vec![combo(&["a"]), combo(&["b"])]);
        assert_eq!(merged.datasets, vec![tagged(3.0), tagged(2.0)]);
        assert!(merged.is_consistent());
    }

    #[test]
    fn branch_depends_on_datasets_only() {
        let listed_only = CacheSnapshot::new(vec![combo(&["a"])], vec![]);
        assert_eq!(branch_for(&listed_only), ReconcileBranch::CacheEmpty);
        assert_eq!(branch_for(&CacheSnapshot::empty()), ReconcileBranch::CacheEmpty);

        let with_data = CacheSnapshot::new(vec![combo(&["a"])], vec![tagged(1.0)]);
        assert_eq!(branch_for(&with_data), ReconcileBranch::CachePresent);
    }
}
