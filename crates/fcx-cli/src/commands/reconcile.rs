//! `fcx reconcile`: one pass of load, diff, compute, merge, persist.

use anyhow::{Context, Result};
use fcx_cache::CacheStore;
use fcx_config::{FeatureCacheConfig, MergedConfig};
use fcx_engineering::{EngineeringAdapter, EngineeringContext, SourceTable, TableAdapter};
use fcx_reconcile::{ReconcileReport, ReconciliationEngine};
use tracing::{info, warn};

use super::{join_display, unused_key_policy};

pub struct ReconcileSummary {
    pub config_hash: String,
    pub mode: &'static str,
    pub adapter: &'static str,
    pub required: usize,
    pub report: ReconcileReport,
}

impl ReconcileSummary {
    pub fn print(&self) {
        let r = &self.report;
        println!("config_hash={}", self.config_hash);
        println!("mode={}", self.mode);
        println!("adapter={}", self.adapter);
        println!("required={}", self.required);
        println!("branch={}", r.branch.as_str());
        println!("new_work={}", r.new_work.len());
        println!("retained={}", r.retained);
        println!("served={}", r.served.len());
        println!("failed={}", r.failures.len());
        for f in &r.failures {
            println!("failure={} reason={}", f.combination, f.reason);
        }
        println!("persisted={}", r.persisted);
        if let Some(reason) = &r.degraded {
            println!("degraded={reason}");
        }
        println!("served_combinations={}", join_display(&r.served.combinations));
    }
}

pub fn run(config_paths: &[String], strict_keys: bool) -> Result<ReconcileSummary> {
    let loaded = MergedConfig::from_paths(config_paths)?;
    let (cfg, unused) = FeatureCacheConfig::from_config_json_with_unused(&loaded.json)
        .context("invalid feature cache config")?;

    let mode = cfg.mode();
    fcx_config::enforce_unused_keys(&unused, unused_key_policy(strict_keys))?;
    if !unused.is_empty() {
        warn!(
            mode = mode.as_str(),
            keys = ?unused,
            "config carries keys no reconcile pass reads"
        );
    }

    let source_path = cfg
        .source_csv
        .as_deref()
        .context("reconcile requires /engineering/source_csv")?;
    let source = SourceTable::from_csv_path(source_path)
        .with_context(|| format!("failed to load source table: {}", source_path.display()))?;

    let adapter = if cfg.window.is_some() {
        TableAdapter::windowed(source)
    } else {
        TableAdapter::new(source)
    };
    let ctx = context_for(&cfg, &loaded)?;

    let required = fcx_combos::try_generate(&cfg.tokens)?;
    info!(
        config_hash = %loaded.config_hash,
        mode = mode.as_str(),
        adapter = adapter.name(),
        required = required.len(),
        cache = %cfg.cache_path.display(),
        "reconcile pass starting"
    );

    let adapter_name = adapter.name();
    let engine = ReconciliationEngine::new(CacheStore::new(&cfg.cache_path), adapter, cfg.period);
    let report = engine.run_pass(&required, ctx.as_ref());

    Ok(ReconcileSummary {
        config_hash: loaded.config_hash,
        mode: mode.as_str(),
        adapter: adapter_name,
        required: required.len(),
        report,
    })
}

/// The windowed adapter receives the whole merged config.
fn context_for(cfg: &FeatureCacheConfig, loaded: &MergedConfig) -> Result<Option<EngineeringContext>> {
    cfg.window
        .map(|(start, end)| EngineeringContext::new(loaded.json.clone(), start, end))
        .transpose()
        .context("invalid engineering window")
}
