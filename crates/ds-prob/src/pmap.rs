//! Sparse value → probability maps.

use std::collections::HashMap;
use std::collections::hash_map;

/// Sparse mapping from total winnings to probability mass.
///
/// Engine-internal: results leave the engine as a
/// [`CumulativeDistribution`](ds_core::CumulativeDistribution).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityMap {
    entries: HashMap<u64, f64>,
}

impl ProbabilityMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty map with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: HashMap::with_capacity(capacity) }
    }

    /// Certainty of winning nothing: `{0: 1}`.
    pub fn unit() -> Self {
        let mut m = Self::with_capacity(1);
        m.accumulate(0, 1.0);
        m
    }

    /// Add `p` to the mass at `value`.
    #[inline]
    pub fn accumulate(&mut self, value: u64, p: f64) {
        *self.entries.entry(value).or_insert(0.0) += p;
    }

    /// Mass at `value`, if any was recorded.
    pub fn get(&self, value: u64) -> Option<f64> {
        self.entries.get(&value).copied()
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no values.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in unspecified order.
    pub fn iter(&self) -> hash_map::Iter<'_, u64, f64> {
        self.entries.iter()
    }

    /// Sum of all mass.
    pub fn total_mass(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Remove every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(u64, f64)> for ProbabilityMap {
    fn from_iter<I: IntoIterator<Item = (u64, f64)>>(iter: I) -> Self {
        let mut m = Self::new();
        for (value, p) in iter {
            m.accumulate(value, p);
        }
        m
    }
}

impl<'a> IntoIterator for &'a ProbabilityMap {
    type Item = (&'a u64, &'a f64);
    type IntoIter = hash_map::Iter<'a, u64, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_merges_values() {
        let mut m = ProbabilityMap::new();
        m.accumulate(3, 0.25);
        m.accumulate(3, 0.5);
        m.accumulate(0, 0.25);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(3), Some(0.75));
        assert_eq!(m.get(7), None);
        assert_eq!(m.total_mass(), 1.0);
    }

    #[test]
    fn test_unit_and_clear() {
        let mut m = ProbabilityMap::unit();
        assert_eq!(m.get(0), Some(1.0));
        m.clear();
        assert!(m.is_empty());
    }

    #[test]
    fn test_collect() {
        let m: ProbabilityMap = [(1, 0.5), (2, 0.25), (1, 0.25)].into_iter().collect();
        assert_eq!(m.get(1), Some(0.75));
        assert_eq!(m.len(), 2);
    }
}
