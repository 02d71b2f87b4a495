use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a list endpoint.
///
/// `next` is an absolute path to the following page, or `None` once the
/// list is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T = Value> {
    #[serde(default)]
    pub results: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub next: Option<String>,
}

/// How many items a paginated fetch should stop at.
pub fn target_count(total: u64, limit: usize) -> usize {
    usize::try_from(total).unwrap_or(usize::MAX).min(limit)
}

/// Identifier of a list item, numeric or string.
pub fn identifier(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Remembers identifiers seen across pages. Items without an identifier are
/// always admitted.
#[derive(Debug, Default)]
pub struct Dedup {
    seen: HashSet<String>,
}

impl Dedup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, item: &Value) -> bool {
        match identifier(item) {
            Some(id) => self.seen.insert(id),
            None => true,
        }
    }
}

/// Drops repeated identifiers, keeping the first occurrence of each.
pub fn dedup_by_id(items: Vec<Value>) -> Vec<Value> {
    let mut dedup = Dedup::new();
    items.into_iter().filter(|item| dedup.admit(item)).collect()
}
