//! Read tracking over the merged config tree.

use anyhow::{bail, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

/// Hands out values by JSON pointer and remembers which pointers were asked for.
pub(crate) struct KeyUsage<'a> {
    root: &'a Value,
    read: RefCell<BTreeSet<String>>,
}

impl<'a> KeyUsage<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self {
            root,
            read: RefCell::new(BTreeSet::new()),
        }
    }

    /// Reading a map or list marks everything below it as read.
    pub(crate) fn get(&self, pointer: &str) -> Option<&'a Value> {
        self.read.borrow_mut().insert(pointer.to_string());
        self.root.pointer(pointer).filter(|v| !v.is_null())
    }

    /// Leaf pointers (sorted) not covered by any read.
    pub(crate) fn unread_leaves(&self) -> Vec<String> {
        let read = self.read.borrow();
        leaf_pointers(self.root)
            .into_iter()
            .filter(|leaf| {
                !read
                    .iter()
                    .any(|p| leaf == p || (leaf.starts_with(p.as_str()) && leaf[p.len()..].starts_with('/')))
            })
            .collect()
    }
}

/// RFC 6901 pointers of every scalar (and empty map/list) in `root`.
fn leaf_pointers(root: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut stack: Vec<(String, &Value)> = vec![(String::new(), root)];
    while let Some((at, v)) = stack.pop() {
        match v {
            Value::Object(map) if !map.is_empty() => {
                for (k, child) in map {
                    let k = k.replace('~', "~0").replace('/', "~1");
                    stack.push((format!("{at}/{k}"), child));
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (i, child) in items.iter().enumerate() {
                    stack.push((format!("{at}/{i}"), child));
                }
            }
            _ if at.is_empty() => {}
            _ => {
                out.insert(at);
            }
        }
    }
    out
}

/// Turn a non-empty unused-key list into a `CONFIG_UNUSED_KEYS` error under `Fail`.
pub fn enforce_unused_keys(unused: &[String], policy: UnusedKeyPolicy) -> Result<()> {
    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} config key(s) are never read by a reconcile pass: {}",
            unused.len(),
            unused.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_prefix_covers_children_on_segment_boundary() {
        let cfg = json!({"cache": {"path": "x", "pathology": 1}, "features": {"tokens": ["a", "b"]}});
        let usage = KeyUsage::new(&cfg);
        usage.get("/cache/path");
        usage.get("/features/tokens");
        assert_eq!(usage.unread_leaves(), vec!["/cache/pathology".to_string()]);
    }

    #[test]
    fn leaf_pointers_escape_tokens() {
        let leaves = leaf_pointers(&json!({"a/b": {"c~d": 1}, "e": []}));
        assert_eq!(
            leaves.into_iter().collect::<Vec<_>>(),
            vec!["/a~1b/c~0d".to_string(), "/e".to_string()]
        );
    }

    #[test]
    fn warn_policy_never_errors() {
        let unused = vec!["/x".to_string()];
        assert!(enforce_unused_keys(&unused, UnusedKeyPolicy::Warn).is_ok());
        let err = enforce_unused_keys(&unused, UnusedKeyPolicy::Fail).unwrap_err();
        assert!(err.to_string().starts_with("CONFIG_UNUSED_KEYS"));
    }
}
