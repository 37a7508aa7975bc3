//! Conversion between sparse [`ProbabilityMap`]s and the dense
//! [`CumulativeDistribution`] wire format.

use ds_core::CumulativeDistribution;
use ds_core::distribution::STRIDE;

use crate::pmap::ProbabilityMap;

/// Output of [`extract_cumulative_probability`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// Normalised, value-sorted distribution.
    pub distribution: CumulativeDistribution,
    /// Mass retained before normalisation.
    pub total_p: f64,
}

/// Sort the entries above `p_cutoff` by value, accumulate, and normalise.
///
/// An empty (or fully pruned) map gives an empty distribution with
/// `total_p == 0`.
pub fn extract_cumulative_probability(map: &ProbabilityMap, p_cutoff: f64) -> Extracted {
    let mut kept: Vec<(u64, f64)> =
        map.iter().filter(|&(_, &p)| p > p_cutoff).map(|(&v, &p)| (v, p)).collect();
    kept.sort_unstable_by_key(|&(v, _)| v);

    let total_p: f64 = kept.iter().map(|&(_, p)| p).sum();
    if kept.is_empty() || total_p <= 0.0 {
        return Extracted { distribution: CumulativeDistribution::empty(), total_p: 0.0 };
    }

    let norm = 1.0 / total_p;
    let mut data = Vec::with_capacity(kept.len() * STRIDE);
    let mut cp = 0.0;
    for (value, p) in kept {
        let p = p * norm;
        cp += p;
        data.extend_from_slice(&[cp, p, value as f64]);
    }
    // absorb rounding so the last entry is exactly 1
    let last = data.len() - STRIDE;
    data[last] = 1.0;

    Extracted { distribution: CumulativeDistribution::from_flat_unchecked(data), total_p }
}

/// Rebuild a sparse map from a dense distribution.
pub fn make_pmap(distribution: &CumulativeDistribution) -> ProbabilityMap {
    distribution.entries().map(|e| (e.value as u64, e.p)).collect()
}
