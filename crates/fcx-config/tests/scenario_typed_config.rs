//! Typed feature-cache config
//!
//! GREEN when:
//! - A layered YAML config decodes into FeatureCacheConfig with its window.
//! - Hand-written comma-joined token entries become trimmed feature names.
//! - Missing required keys, inverted windows and unknown periods are errors.
//! - The decoded mode agrees with the window presence.

use anyhow::Result;
use chrono::NaiveDate;
use fcx_config::{EngineeringMode, FeatureCacheConfig, MergedConfig};
use fcx_schemas::ParameterPeriod;
use std::path::PathBuf;

const YAML: &str = r#"
cache:
  path: "var/features.json"
features:
  tokens: ["rsi, macd", "obv"]
engineering:
  period: "long_term"
  source_csv: "data/raw.csv"
  min_rows: 2
  window:
    start: "2024-01-01"
    end: "2024-03-31"
"#;

fn decode(docs: &[&str]) -> Result<FeatureCacheConfig> {
    let merged = MergedConfig::from_yaml_docs(docs)?;
    FeatureCacheConfig::from_config_json(&merged.json)
}

#[test]
fn decodes_windowed_config() -> Result<()> {
    let cfg = decode(&[YAML])?;

    assert_eq!(cfg.cache_path, PathBuf::from("var/features.json"));
    assert_eq!(cfg.tokens, vec!["rsi", "macd", "obv"]);
    assert_eq!(cfg.period, ParameterPeriod::LongTerm);
    assert_eq!(cfg.source_csv, Some(PathBuf::from("data/raw.csv")));
    assert_eq!(
        cfg.window,
        Some((
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        ))
    );
    assert_eq!(cfg.min_rows, Some(2));
    assert_eq!(cfg.mode(), EngineeringMode::Windowed);
    Ok(())
}

#[test]
fn missing_cache_path_is_an_error() {
    let err = decode(&["features:\n  tokens: [a]\n"]).unwrap_err();
    assert!(err.to_string().contains("/cache/path"));
}

#[test]
fn inverted_window_is_an_error() {
    let err = decode(&[YAML, "engineering:\n  window:\n    start: \"2024-05-01\"\n"]).unwrap_err();
    assert!(err.to_string().contains("after end"));
}

#[test]
fn unknown_period_is_an_error() {
    let err = decode(&[YAML, "engineering:\n  period: \"weekly\"\n"]).unwrap_err();
    assert!(err.to_string().contains("weekly"));
}
