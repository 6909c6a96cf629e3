//! fcx-reconcile
//!
//! Reconciliation pass for the feature cache:
//! - diff the required combinations against the cached ones
//! - compute only the missing work through an [`fcx_engineering::EngineeringAdapter`]
//! - merge and dedupe (cache empty) or serve fresh work only (cache present)
//! - overwrite the snapshot on disk
//!
//! No error escapes [`ReconciliationEngine::reconcile`]: failures degrade to
//! an empty served set recorded in the [`ReconcileReport`].

mod engine;
mod types;

pub use engine::{diff_required, merge_last_write_wins, retain_required, ReconciliationEngine};
pub use types::*;
