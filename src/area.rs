//! Drawn area per sensation category.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::model::Sensation;

/// Pixel counts keyed by sensation, plus their running total.
///
/// Serializes as a JSON object keyed `"valence:intensity"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaTally {
    counts: BTreeMap<Sensation, u64>,
    total: u64,
}

impl AreaTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one pixel under `sensation`.
    pub fn record(&mut self, sensation: Sensation) {
        *self.counts.entry(sensation).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn get(&self, sensation: Sensation) -> u64 {
        self.counts.get(&sensation).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sensation, u64)> + '_ {
        self.counts.iter().map(|(s, n)| (*s, *n))
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }
}

impl Serialize for AreaTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (sensation, count) in &self.counts {
            map.serialize_entry(&sensation.to_string(), count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_total() {
        let mut t = AreaTally::new();
        t.record(Sensation::new(-1, 2));
        t.record(Sensation::new(-1, 2));
        t.record(Sensation::new(3, 1));

        assert_eq!(t.get(Sensation::new(-1, 2)), 2);
        assert_eq!(t.get(Sensation::new(3, 1)), 1);
        assert_eq!(t.get(Sensation::new(0, 0)), 0);
        assert_eq!(t.total(), 3);
        assert_eq!(t.iter().map(|(_, n)| n).sum::<u64>(), t.total());
    }

    #[test]
    fn test_serializes_with_string_keys() {
        let mut t = AreaTally::new();
        t.record(Sensation::new(-2, 5));
        t.record(Sensation::new(1, 1));
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"-2:5":1,"1:1":1}"#);
    }

    #[test]
    fn test_clear() {
        let mut t = AreaTally::new();
        t.record(Sensation::new(0, 1));
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.iter().count(), 0);
    }
}
