//! Dense cumulative distribution (the engine wire format) and its queries.
//!
//! Layout: flat `f64` triplets `(cp, p, value)` sorted ascending by value.
//! The buffer is immutable and reference counted, so results can be cloned
//! and handed across threads without copying.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CP: usize = 0;
const P: usize = 1;
const VALUE: usize = 2;

/// Number of `f64` slots per entry.
pub const STRIDE: usize = 3;

/// Tolerance used when validating externally supplied buffers.
const PROB_TOLERANCE: f64 = 1e-9;

/// Largest value that converts to and from `u64` exactly (2^53).
const MAX_VALUE: f64 = 9_007_199_254_740_992.0;

/// One decoded entry of a [`CumulativeDistribution`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// Cumulative probability up to and including this value.
    pub cp: f64,
    /// Probability of exactly this value.
    pub p: f64,
    /// Total winnings.
    pub value: f64,
}

/// Sorted dense encoding of a probability map plus its running sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct CumulativeDistribution {
    data: Arc<[f64]>,
}

impl CumulativeDistribution {
    /// A distribution with no outcomes.
    pub fn empty() -> Self {
        Self { data: Arc::from(Vec::new()) }
    }

    /// Certainty of a single value (e.g. zero winnings for zero tickets).
    pub fn point(value: f64) -> Self {
        Self { data: Arc::from(vec![1.0, 1.0, value]) }
    }

    /// Wrap a buffer produced by the codec.
    ///
    /// The caller guarantees ascending values and normalised probabilities;
    /// no checks are made.
    pub fn from_flat_unchecked(data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len() % STRIDE, 0);
        Self { data: Arc::from(data) }
    }

    /// Validate and wrap an externally supplied buffer.
    pub fn from_flat(data: Vec<f64>) -> Result<Self> {
        if data.len() % STRIDE != 0 {
            return Err(Error::validation(format!(
                "cumulative buffer length must be a multiple of {STRIDE}, got {}",
                data.len()
            )));
        }
        let mut prev_value = f64::NEG_INFINITY;
        let mut prev_cp = 0.0;
        for (i, e) in data.chunks_exact(STRIDE).enumerate() {
            let (cp, p, value) = (e[CP], e[P], e[VALUE]);
            if !(0.0..=MAX_VALUE).contains(&value) || value.fract() != 0.0 {
                return Err(Error::validation(format!(
                    "values must be whole non-negative amounts (entry {i}: {value})"
                )));
            }
            if value <= prev_value {
                return Err(Error::validation(format!("values must be strictly ascending (entry {i}: {value})")));
            }
            if !(0.0..=1.0 + PROB_TOLERANCE).contains(&p) {
                return Err(Error::validation(format!("p must be in [0,1] (entry {i}: {p})")));
            }
            if !(0.0..=1.0 + PROB_TOLERANCE).contains(&cp) || cp + PROB_TOLERANCE < prev_cp {
                return Err(Error::validation(format!(
                    "cp must be in [0,1] and non-decreasing (entry {i}: {cp})"
                )));
            }
            prev_value = value;
            prev_cp = cp;
        }
        Ok(Self { data: Arc::from(data) })
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.data.len() / STRIDE
    }

    /// Whether there are no outcomes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw `(cp, p, value)` triplets.
    pub fn as_flat(&self) -> &[f64] {
        &self.data
    }

    /// Shared handle to the underlying buffer (no copy).
    pub fn buffer(&self) -> Arc<[f64]> {
        Arc::clone(&self.data)
    }

    /// Whether two distributions share the same buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Decode entry `i`.
    ///
    /// # Panics
    /// If `i >= self.len()`.
    pub fn entry(&self, i: usize) -> Entry {
        let x = i * STRIDE;
        Entry { cp: self.data[x + CP], p: self.data[x + P], value: self.data[x + VALUE] }
    }

    /// Iterate entries in ascending value order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = Entry> + '_ {
        self.data.chunks_exact(STRIDE).map(|e| Entry { cp: e[CP], p: e[P], value: e[VALUE] })
    }

    #[inline]
    fn value_at(&self, i: usize) -> f64 {
        self.data[i * STRIDE + VALUE]
    }

    #[inline]
    fn cp_at(&self, i: usize) -> f64 {
        self.data[i * STRIDE + CP]
    }

    /// Number of leading entries for which `pred` holds (entries must be
    /// partitioned by `pred`).
    fn partition_point(&self, pred: impl Fn(usize) -> bool) -> usize {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if pred(mid) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Lowest possible value, `None` when empty.
    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.value_at(0))
    }

    /// Highest possible value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.value_at(self.len() - 1))
    }

    /// P(value < x). `NaN` when `x` is `NaN`.
    pub fn p_below(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let (Some(min), Some(max)) = (self.min(), self.max()) else {
            return 0.0;
        };
        if x <= min {
            return 0.0;
        }
        if x > max {
            return 1.0;
        }
        let below = self.partition_point(|i| self.value_at(i) < x);
        self.cp_at(below - 1)
    }

    /// P(value == x); zero for values that cannot occur.
    pub fn exact_probability(&self, x: f64) -> f64 {
        let i = self.partition_point(|i| self.value_at(i) < x);
        if i < self.len() && self.value_at(i) == x { self.entry(i).p } else { 0.0 }
    }

    /// P(low <= value < high). `NaN` when either bound is `NaN`.
    pub fn range_probability(&self, low: f64, high: f64) -> f64 {
        (self.p_below(high) - self.p_below(low)).clamp(0.0, 1.0)
    }

    /// Smallest value whose cumulative probability reaches `q` percent,
    /// clamped to `[min, max]`. `NaN` when empty.
    pub fn percentile(&self, q: f64) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        let target = q / 100.0;
        let i = self.partition_point(|i| self.cp_at(i) < target);
        self.value_at(i.min(self.len() - 1))
    }

    /// 50th percentile.
    pub fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    /// Expected value.
    pub fn mean(&self) -> f64 {
        self.entries().map(|e| e.p * e.value).sum()
    }

    /// Value with the highest single-entry probability. Ties resolve to the
    /// lowest such value. `NaN` when empty.
    pub fn mode(&self) -> f64 {
        let mut best: Option<Entry> = None;
        for e in self.entries() {
            if best.is_none_or(|b| e.p > b.p) {
                best = Some(e);
            }
        }
        best.map_or(f64::NAN, |e| e.value)
    }
}

impl TryFrom<Vec<f64>> for CumulativeDistribution {
    type Error = Error;

    fn try_from(data: Vec<f64>) -> Result<Self> {
        Self::from_flat(data)
    }
}

impl From<CumulativeDistribution> for Vec<f64> {
    fn from(d: CumulativeDistribution) -> Self {
        d.data.to_vec()
    }
}
