//! Cache snapshot store scenarios
//!
//! GREEN when:
//! - save then load returns the same combinations and dataset contents.
//! - Missing or corrupt files load as an empty snapshot without erroring.
//! - A second save fully replaces the first (no append).
//! - A save that cannot be written reports `false` instead of panicking.
//! - Two stores in one process never see each other's state.

use anyhow::Result;
use fcx_cache::{CacheStore, SNAPSHOT_SCHEMA_VERSION};
use fcx_schemas::{CacheSnapshot, Dataset, FeatureCombination};
use std::fs;
use tempfile::tempdir;

fn combo(tokens: &[&str]) -> FeatureCombination {
    FeatureCombination::from_tokens(tokens.iter().copied())
}

fn dataset(cols: &[&str], rows: Vec<Vec<f64>>) -> Dataset {
    Dataset::new(cols.iter().map(|c| c.to_string()).collect(), rows).unwrap()
}

fn sample_snapshot() -> CacheSnapshot {
    CacheSnapshot::new(
        vec![combo(&["rsi"]), combo(&["rsi", "macd"])],
        vec![
            dataset(&["rsi"], vec![vec![0.0], vec![0.5], vec![1.0]]),
            dataset(
                &["rsi", "macd"],
                vec![vec![0.0, 1.0], vec![0.5, 0.0], vec![1.0, 0.25]],
            ),
        ],
    )
}

#[test]
fn save_then_load_round_trips() -> Result<()> {
    let tmp = tempdir()?;
    let store = CacheStore::new(tmp.path().join("features.json"));

    let snapshot = sample_snapshot();
    let saved = store.try_save(&snapshot)?;
    assert_eq!(saved.entries, 2);

    let loaded = store.try_load()?.expect("snapshot file must exist after save");
    assert_eq!(loaded, snapshot);
    assert!(loaded.is_consistent());
    Ok(())
}

#[test]
fn missing_file_loads_empty() -> Result<()> {
    let tmp = tempdir()?;
    let store = CacheStore::new(tmp.path().join("absent.json"));

    assert!(store.try_load()?.is_none());
    assert!(store.load().is_empty());
    assert!(store.inspect()?.is_none());
    Ok(())
}

#[test]
fn corrupt_file_loads_empty_without_error() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("features.json");
    fs::write(&path, "{ this is not json")?;

    let store = CacheStore::new(&path);
    assert!(store.try_load().is_err(), "strict load must surface the decode error");
    assert!(store.load().is_empty(), "lenient load must degrade to empty");
    Ok(())
}

#[test]
fn ragged_dataset_on_disk_is_treated_as_corrupt() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("features.json");
    fs::write(
        &path,
        r#"{
  "schema_version": 1,
  "snapshot_id": "00000000-0000-0000-0000-000000000002",
  "saved_at_utc": "2026-03-01T00:00:00Z",
  "combinations": [["a", "b"]],
  "datasets": [[{"name": "a", "values": [1.0, 2.0]}, {"name": "b", "values": [1.0]}]]
}"#,
    )?;

    let store = CacheStore::new(&path);
    assert!(store.load().is_empty());
    Ok(())
}

#[test]
fn newer_schema_version_is_rejected() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("features.json");
    let future = SNAPSHOT_SCHEMA_VERSION + 1;
    fs::write(
        &path,
        format!(
            r#"{{"schema_version": {future}, "snapshot_id": "00000000-0000-0000-0000-000000000003",
                "saved_at_utc": "2026-03-01T00:00:00Z", "combinations": [], "datasets": []}}"#
        ),
    )?;

    let store = CacheStore::new(&path);
    assert!(store.try_load().is_err());
    assert!(store.load().is_empty());
    Ok(())
}

#[test]
fn second_save_overwrites_first() -> Result<()> {
    let tmp = tempdir()?;
    let store = CacheStore::new(tmp.path().join("features.json"));

    store.try_save(&sample_snapshot())?;
    let first = store.inspect()?.expect("first snapshot");

    let smaller = CacheSnapshot::new(
        vec![combo(&["obv"])],
        vec![dataset(&["obv"], vec![vec![0.25]])],
    );
    store.try_save(&smaller)?;

    let second = store.inspect()?.expect("second snapshot");
    assert_ne!(first.snapshot_id, second.snapshot_id);
    assert_eq!(second.combinations, 1);
    assert_eq!(second.datasets, 1);
    assert_eq!(store.load(), smaller);
    Ok(())
}

#[test]
fn save_into_nested_missing_dirs_creates_them() -> Result<()> {
    let tmp = tempdir()?;
    let store = CacheStore::new(tmp.path().join("a").join("b").join("features.json"));
    assert!(store.save(&sample_snapshot()));
    assert_eq!(store.load().len(), 2);
    Ok(())
}

#[test]
fn unwritable_target_reports_false() -> Result<()> {
    let tmp = tempdir()?;
    // The target path is an existing, non-empty directory: the final rename fails.
    let target = tmp.path().join("occupied");
    fs::create_dir_all(target.join("inner"))?;

    let store = CacheStore::new(&target);
    assert!(!store.save(&sample_snapshot()));
    Ok(())
}

#[test]
fn clear_removes_snapshot() -> Result<()> {
    let tmp = tempdir()?;
    let store = CacheStore::new(tmp.path().join("features.json"));
    assert!(!store.clear()?);

    store.try_save(&sample_snapshot())?;
    assert!(store.clear()?);
    assert!(store.load().is_empty());
    Ok(())
}

#[test]
fn independent_stores_do_not_share_state() -> Result<()> {
    let tmp = tempdir()?;
    let a = CacheStore::new(tmp.path().join("a.json"));
    let b = CacheStore::new(tmp.path().join("b.json"));

    a.try_save(&sample_snapshot())?;
    assert_eq!(a.load().len(), 2);
    assert!(b.load().is_empty());
    Ok(())
}
