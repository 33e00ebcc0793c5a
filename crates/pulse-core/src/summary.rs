use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Point-in-time count of records per status category.
///
/// Built fresh on every computation and immutable after that. Categories
/// with zero members are absent, never present with a zero count, matching
/// the grouping query that produces it. Serializes as a flat JSON object,
/// e.g. `{"active":3,"idle":2}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSummary {
    counts: BTreeMap<String, u64>,
}

impl StatusSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a summary from (category, count) pairs as returned by a
    /// grouping query. Zero counts are skipped.
    pub fn from_counts<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let counts = pairs
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(k, n)| (k.into(), n))
            .collect();
        Self { counts }
    }

    pub fn get(&self, category: &str) -> Option<u64> {
        self.counts.get(category).copied()
    }

    /// Total records across all categories.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_all_categories() {
        let summary = StatusSummary::from_counts([("active", 3), ("idle", 2)]);
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.get("active"), Some(3));
        assert_eq!(summary.get("idle"), Some(2));
    }

    #[test]
    fn zero_counts_are_absent() {
        let summary = StatusSummary::from_counts([("active", 3), ("gone", 0)]);
        assert_eq!(summary.get("gone"), None);
        assert_eq!(summary.len(), 1);
    }

    #[test]
    fn empty_summary() {
        let summary = StatusSummary::new();
        assert!(summary.is_empty());
        assert_eq!(summary.total(), 0);
        assert_eq!(serde_json::to_string(&summary).unwrap(), "{}");
    }

    #[test]
    fn serializes_as_flat_object() {
        let summary = StatusSummary::from_counts([("active", 3), ("idle", 1)]);
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"active":3,"idle":1}"#);
    }

    #[test]
    fn content_equality() {
        let a = StatusSummary::from_counts([("active", 3), ("idle", 2)]);
        let b = StatusSummary::from_counts([("idle", 2), ("active", 3)]);
        assert_eq!(a, b);
    }
}
