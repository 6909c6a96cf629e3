//! fcx-combos
//!
//! Combination generator: raw feature tokens (possibly comma-joined) in,
//! every non-empty subset out.
//!
//! Ordering contract:
//! - sizes ascend (all 1-token combinations, then all 2-token, ...)
//! - within a size, index-increasing lexicographic order over the token list
//! - tokens inside a combination keep their input order
//!
//! Duplicate tokens are NOT removed, so `n` positions always yield `2^n - 1`
//! combinations. Deterministic, pure logic. No IO.

use fcx_schemas::FeatureCombination;
use std::fmt;
use tracing::debug;

/// Largest token count [`try_generate`] will expand (2^20 - 1 combinations).
pub const MAX_TOKENS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombosError {
    TooManyTokens { got: usize, max: usize },
}

impl fmt::Display for CombosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombosError::TooManyTokens { got, max } => write!(
                f,
                "refusing to expand {got} feature tokens (max {max}): \
                 combination count grows as 2^n - 1"
            ),
        }
    }
}

impl std::error::Error for CombosError {}

/// Split every raw entry on `,` and flatten, keeping order and duplicates.
///
/// Pieces are taken verbatim: `"rsi, macd"` yields `"rsi"` and `" macd"`,
/// and `""` yields one empty token. Cache keys depend on this exact form.
pub fn split_tokens<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|entry| entry.as_ref().split(','))
        .map(str::to_string)
        .collect()
}

/// `2^n - 1`, or `None` if it does not fit in a u64.
pub fn expected_count(n: usize) -> Option<u64> {
    if n >= 64 {
        return None;
    }
    Some((1u64 << n) - 1)
}

/// Every non-empty subset of the split token list.
pub fn generate<S: AsRef<str>>(raw: &[S]) -> Vec<FeatureCombination> {
    let tokens = split_tokens(raw);
    debug!(tokens = ?tokens, "processed feature tokens");

    let mut out = Vec::new();
    for r in 1..=tokens.len() {
        let before = out.len();
        push_combinations_of_size(&tokens, r, &mut out);
        debug!(size = r, generated = out.len() - before, "generated combinations");
    }

    debug!(total = out.len(), "feature combinations generated");
    out
}

/// [`generate`] guarded by [`MAX_TOKENS`].
pub fn try_generate<S: AsRef<str>>(raw: &[S]) -> Result<Vec<FeatureCombination>, CombosError> {
    let n = split_tokens(raw).len();
    if n > MAX_TOKENS {
        return Err(CombosError::TooManyTokens {
            got: n,
            max: MAX_TOKENS,
        });
    }
    Ok(generate(raw))
}

fn push_combinations_of_size(tokens: &[String], r: usize, out: &mut Vec<FeatureCombination>) {
    let n = tokens.len();
    if r == 0 || r > n {
        return;
    }

    // Index cursor: [0, 1, .., r-1] advancing like an odometer.
    let mut idx: Vec<usize> = (0..r).collect();
    loop {
        out.push(FeatureCombination::from_tokens(
            idx.iter().map(|&i| tokens[i].clone()),
        ));

        // Rightmost position that can still move.
        let mut i = r;
        loop {
            if i == 0 {
                return;
            }
            i -= 1;
            if idx[i] != i + n - r {
                break;
            }
        }
        idx[i] += 1;
        for j in i + 1..r {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(combos: &[FeatureCombination]) -> Vec<String> {
        combos.iter().map(|c| c.joined()).collect()
    }

    #[test]
    fn three_tokens_in_lexicographic_size_order() {
        let out = generate(&["a", "b", "c"]);
        assert_eq!(
            joined(&out),
            vec!["a", "b", "c", "a,b", "a,c", "b,c", "a,b,c"]
        );
    }

    #[test]
    fn no_entries_yield_nothing() {
        let none: [&str; 0] = [];
        assert!(generate(&none).is_empty());
    }

    #[test]
    fn empty_entry_is_one_empty_token() {
        assert_eq!(generate(&[""]), vec![FeatureCombination::from_tokens([""])]);
        assert_eq!(split_tokens(&[","]), vec!["".to_string(), "".to_string()]);
    }

    #[test]
    fn split_keeps_whitespace_duplicates_and_order() {
        assert_eq!(
            split_tokens(&["rsi, macd", "rsi"]),
            vec!["rsi".to_string(), " macd".to_string(), "rsi".to_string()]
        );
        let out = generate(&["rsi, macd"]);
        assert_eq!(joined(&out), vec!["rsi", " macd", "rsi, macd"]);
        assert_eq!(out[1], FeatureCombination::from_tokens([" macd"]));
    }

    #[test]
    fn duplicates_inflate_count() {
        let out = generate(&["a,a"]);
        assert_eq!(joined(&out), vec!["a", "a", "a,a"]);
    }

    #[test]
    fn expected_count_matches_power_of_two() {
        assert_eq!(expected_count(0), Some(0));
        assert_eq!(expected_count(4), Some(15));
        assert_eq!(expected_count(64), None);
    }

    #[test]
    fn try_generate_refuses_oversized_input() {
        let raw: Vec<String> = (0..=MAX_TOKENS).map(|i| format!("f{i}")).collect();
        let err = try_generate(&raw).unwrap_err();
        assert_eq!(
            err,
            CombosError::TooManyTokens {
                got: MAX_TOKENS + 1,
                max: MAX_TOKENS
            }
        );
        assert!(try_generate(&["a", "b"]).is_ok());
    }
}
