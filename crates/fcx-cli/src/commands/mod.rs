//! Command handler modules for fcx-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod cache;
pub mod reconcile;

use fcx_config::UnusedKeyPolicy;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub fn unused_key_policy(strict: bool) -> UnusedKeyPolicy {
    if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    }
}

/// Space-joined `Display` forms, for one-line output.
pub fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
