#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;

use fcx_engineering::{EngineeringAdapter, EngineeringContext, EngineeringError};
use fcx_schemas::{Dataset, FeatureCombination, ParameterPeriod};

pub fn combo(tokens: &[&str]) -> FeatureCombination {
    FeatureCombination::from_tokens(tokens.iter().copied())
}

/// 1x1 dataset whose single value identifies where it came from.
pub fn tagged(tag: f64) -> Dataset {
    Dataset::new(vec!["tag".to_string()], vec![vec![tag]]).unwrap()
}

pub fn tag_of(d: &Dataset) -> f64 {
    d.rows()[0][0]
}

/// Records every combination it is asked for; fails the configured tokens.
///
/// Each computed dataset is tagged with `tag`.
pub struct RecordingAdapter {
    pub tag: f64,
    pub fail_tokens: HashSet<String>,
    pub requires_context: bool,
    pub calls: RefCell<Vec<FeatureCombination>>,
    pub contexts_seen: RefCell<usize>,
}

impl RecordingAdapter {
    pub fn new(tag: f64) -> Self {
        Self {
            tag,
            fail_tokens: HashSet::new(),
            requires_context: false,
            calls: RefCell::new(Vec::new()),
            contexts_seen: RefCell::new(0),
        }
    }

    pub fn failing(mut self, token: &str) -> Self {
        self.fail_tokens.insert(token.to_string());
        self
    }

    pub fn with_required_context(mut self) -> Self {
        self.requires_context = true;
        self
    }

    pub fn calls(&self) -> Vec<FeatureCombination> {
        self.calls.borrow().clone()
    }
}

impl EngineeringAdapter for RecordingAdapter {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn compute_one(
        &self,
        combination: &FeatureCombination,
        _period: ParameterPeriod,
        ctx: Option<&EngineeringContext>,
    ) -> Result<Dataset, EngineeringError> {
        self.calls.borrow_mut().push(combination.clone());
        if ctx.is_some() {
            *self.contexts_seen.borrow_mut() += 1;
        }
        if self.requires_context && ctx.is_none() {
            return Err(EngineeringError::MissingContext);
        }
        if combination.tokens().iter().any(|t| self.fail_tokens.contains(t)) {
            return Err(EngineeringError::Compute(format!("{combination} blew up")));
        }
        Ok(tagged(self.tag))
    }
}
