use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use fcx_schemas::ParameterPeriod;
use serde_json::Value;

use crate::usage::KeyUsage;

/// Whether a pass runs the plain adapter or the windowed (parameterized) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineeringMode {
    Plain,
    Windowed,
}

impl EngineeringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineeringMode::Plain => "PLAIN",
            EngineeringMode::Windowed => "WINDOWED",
        }
    }
}

/// Typed view over the merged config JSON.
///
/// Keys:
/// - `/cache/path` (required)
/// - `/features/tokens` (required): list of names; entries may be comma-joined
/// - `/engineering/period`: defaults to `short_term`
/// - `/engineering/source_csv`
/// - `/engineering/window/{start,end}`: both or neither
/// - `/engineering/min_rows`: read only when a window is set
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCacheConfig {
    pub cache_path: PathBuf,
    /// Feature names, one per token. Comma-joined entries are split here and
    /// each piece is trimmed, so hand-written `"rsi, macd"` means `rsi`, `macd`.
    pub tokens: Vec<String>,
    pub period: ParameterPeriod,
    pub source_csv: Option<PathBuf>,
    /// Inclusive (start, end).
    pub window: Option<(NaiveDate, NaiveDate)>,
    pub min_rows: Option<u64>,
}

impl FeatureCacheConfig {
    pub fn from_config_json(v: &Value) -> Result<Self> {
        Self::decode(&KeyUsage::new(v))
    }

    /// Decode, and list the leaf pointers the decode never looked at.
    pub fn from_config_json_with_unused(v: &Value) -> Result<(Self, Vec<String>)> {
        let usage = KeyUsage::new(v);
        let cfg = Self::decode(&usage)?;
        Ok((cfg, usage.unread_leaves()))
    }

    pub fn mode(&self) -> EngineeringMode {
        if self.window.is_some() {
            EngineeringMode::Windowed
        } else {
            EngineeringMode::Plain
        }
    }

    fn decode(cfg: &KeyUsage<'_>) -> Result<Self> {
        let cache_path = string_at(cfg, "/cache/path")?
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| anyhow!("config /cache/path is required"))?;

        let tokens = match cfg.get("/features/tokens") {
            Some(Value::Array(entries)) => {
                let mut tokens = Vec::new();
                for (i, entry) in entries.iter().enumerate() {
                    let raw = scalar_text(entry).with_context(|| format!("/features/tokens/{i}"))?;
                    tokens.extend(feature_names(&raw));
                }
                tokens
            }
            Some(Value::String(joined)) => feature_names(joined),
            Some(other) => bail!("config /features/tokens must be a list, got {other}"),
            None => bail!("config /features/tokens is required"),
        };

        let period = match string_at(cfg, "/engineering/period")? {
            None => ParameterPeriod::default(),
            Some(s) => ParameterPeriod::parse(&s)
                .ok_or_else(|| anyhow!("config /engineering/period: unknown period '{s}'"))?,
        };

        let source_csv = string_at(cfg, "/engineering/source_csv")?.map(PathBuf::from);

        let window = match (
            date_at(cfg, "/engineering/window/start")?,
            date_at(cfg, "/engineering/window/end")?,
        ) {
            (None, None) => None,
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            (Some(start), Some(end)) => {
                bail!("config engineering window: start {start} is after end {end}")
            }
            _ => bail!("config engineering window needs both start and end"),
        };

        let min_rows = match window {
            None => None,
            Some(_) => match cfg.get("/engineering/min_rows") {
                None => None,
                Some(v) => Some(
                    v.as_u64()
                        .ok_or_else(|| anyhow!("config /engineering/min_rows must be a non-negative integer, got {v}"))?,
                ),
            },
        };

        Ok(Self {
            cache_path: PathBuf::from(cache_path),
            tokens,
            period,
            source_csv,
            window,
            min_rows,
        })
    }
}

/// Split a hand-written entry into trimmed, non-empty names.
fn feature_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar_text(v: &Value) -> Result<String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        // YAML lets bare numbers and bools through.
        Value::Number(_) | Value::Bool(_) => Ok(v.to_string()),
        other => bail!("expected a scalar, got {other}"),
    }
}

fn string_at(cfg: &KeyUsage<'_>, pointer: &str) -> Result<Option<String>> {
    match cfg.get(pointer) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => bail!("config {pointer} must be a string, got {other}"),
    }
}

fn date_at(cfg: &KeyUsage<'_>, pointer: &str) -> Result<Option<NaiveDate>> {
    let Some(raw) = string_at(cfg, pointer)? else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(Some)
        .with_context(|| format!("config {pointer}: '{raw}' is not a YYYY-MM-DD date"))
}
