//! fcx-config
//!
//! Layered YAML configuration for feature-cache passes.
//!
//! Layers are applied in order onto one JSON tree (later layers win, maps
//! merge key by key). The merged tree is identified by the SHA-256 of its
//! key-sorted compact JSON. [`FeatureCacheConfig`] is the typed view; while
//! decoding it records every pointer it reads, so keys nobody reads can be
//! reported without a hand-kept registry.

mod typed;
mod usage;

pub use typed::{EngineeringMode, FeatureCacheConfig};
pub use usage::{enforce_unused_keys, UnusedKeyPolicy};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Merged configuration plus its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    pub json: Value,
    /// Key-sorted compact JSON of `json`; the hash input.
    pub canonical_json: String,
    pub config_hash: String,
}

impl MergedConfig {
    /// Read and merge YAML files in the given order.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut docs = Vec::with_capacity(paths.len());
        for p in paths {
            let p = p.as_ref();
            docs.push(
                fs::read_to_string(p)
                    .with_context(|| format!("read config layer failed: {}", p.display()))?,
            );
        }
        Self::from_yaml_docs(&docs)
    }

    pub fn from_yaml_docs<S: AsRef<str>>(docs: &[S]) -> Result<Self> {
        let mut json = Value::Object(Default::default());
        for (i, doc) in docs.iter().enumerate() {
            let layer: Value = serde_yaml::from_str(doc.as_ref())
                .with_context(|| format!("config layer #{i} is not valid yaml"))?;
            // An empty file parses as null; it contributes nothing.
            if layer.is_null() {
                continue;
            }
            overlay(&mut json, layer);
        }

        // serde_json maps are key-sorted, so the compact form is canonical.
        let canonical_json = serde_json::to_string(&json).context("config json serialize failed")?;
        let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
        Ok(Self {
            json,
            canonical_json,
            config_hash,
        })
    }
}

/// Apply `layer` onto `base` in place. Maps merge per key; anything else
/// (scalars, lists, null) replaces the base value.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(into), Value::Object(from)) => {
            for (key, value) in from {
                match into.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        into.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
