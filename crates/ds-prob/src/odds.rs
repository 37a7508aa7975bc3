//! Hypergeometric odds tables.
//!
//! With `T = total`, `x = targets`, `s = samples`, the probability that
//! exactly `n` of the `s` samples fall among the `x` targets is
//!
//! ```text
//! (x C n) * ((T - x) C (s - n)) / (T C s)
//! ```
//!
//! Only the entry at the mode is evaluated in the log domain; the rest
//! follow outwards from the ratio of consecutive terms:
//!
//! ```text
//! p(n + 1) / p(n) = ((x - n) * (s - n)) / ((n + 1 - B) * (n + 1)),  B = x + s - T
//! ```

use crate::factorial::ln_factorial;

/// Contiguous run of nonzero odds starting at success count `start`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OddsTable {
    start: u64,
    values: Vec<f64>,
}

impl OddsTable {
    /// Empty table, to be filled by [`calculate_odds_nopad_into`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Success count of `values()[0]`.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// The nonzero run.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Length of the nonzero run.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the run is empty (only before the first fill).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Probability of exactly `k` successes (zero outside the run).
    pub fn get(&self, k: u64) -> f64 {
        k.checked_sub(self.start)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.values.get(i).copied())
            .unwrap_or(0.0)
    }

    /// Index (into `values()`) of the first local maximum.
    ///
    /// Hypergeometric odds are unimodal, so this is the global peak.
    pub fn peak(&self) -> usize {
        for i in 1..self.values.len() {
            if self.values[i] < self.values[i - 1] {
                return i - 1;
            }
        }
        self.values.len().saturating_sub(1)
    }

    fn set_single(&mut self, start: u64, p: f64) {
        self.start = start;
        self.values.clear();
        self.values.push(p);
    }
}

/// Fill `table` with the nonzero run of hypergeometric odds.
///
/// Requires `targets <= total` and `samples <= total`.
pub fn calculate_odds_nopad_into(table: &mut OddsTable, total: u64, targets: u64, samples: u64) {
    debug_assert!(targets <= total && samples <= total, "odds({total}, {targets}, {samples})");

    if samples == 0 || targets == 0 {
        table.set_single(0, 1.0);
        return;
    }
    if targets == total {
        table.set_single(samples, 1.0);
        return;
    }
    if samples == 1 {
        let p = targets as f64 / total as f64;
        table.start = 0;
        table.values.clear();
        table.values.extend_from_slice(&[1.0 - p, p]);
        return;
    }

    let b = i128::from(targets) + i128::from(samples) - i128::from(total);
    let lo = u64::try_from(b.max(0)).unwrap_or(0);
    let hi = targets.min(samples);
    let mode = ((((samples + 1) as f64) * ((targets + 1) as f64) / ((total + 2) as f64)).floor()
        as u64)
        .clamp(lo, hi);

    let len = (hi - lo + 1) as usize;
    let bf = b as f64;
    let (x, s) = (targets as f64, samples as f64);
    let values = &mut table.values;
    values.clear();
    values.resize(len, 0.0);

    let m = (mode - lo) as usize;
    values[m] = ln_hypergeometric(total, targets, samples, mode).exp();

    // p(n + 1) = p(n) * (x - n)(s - n) / ((n + 1 - B)(n + 1))
    for i in m + 1..len {
        let n = (lo + i as u64 - 1) as f64;
        let next = values[i - 1] * ((x - n) * (s - n)) / ((n + 1.0 - bf) * (n + 1.0));
        if next <= 0.0 {
            break;
        }
        values[i] = next;
    }
    // p(n - 1) = p(n) * (n - B) n / ((x - n + 1)(s - n + 1))
    for i in (0..m).rev() {
        let n = (lo + i as u64 + 1) as f64;
        let prev = values[i + 1] * ((n - bf) * n) / ((x - n + 1.0) * (s - n + 1.0));
        if prev <= 0.0 {
            break;
        }
        values[i] = prev;
    }

    // drop underflowed tails so the run stays contiguous and nonzero
    let first = values.iter().position(|&p| p > 0.0).unwrap_or(m);
    let last = values.iter().rposition(|&p| p > 0.0).unwrap_or(m);
    values.truncate(last + 1);
    values.drain(..first);
    table.start = lo + first as u64;
}

/// `ln P(n successes)`, evaluated directly.
fn ln_hypergeometric(total: u64, targets: u64, samples: u64, n: u64) -> f64 {
    ln_factorial(targets) - ln_factorial(n) - ln_factorial(targets - n)
        + ln_factorial(samples)
        - ln_factorial(samples - n)
        + ln_factorial(total - samples)
        - ln_factorial(total)
        + ln_factorial(total - targets)
        - ln_factorial(total - targets + n - samples)
}

/// Nonzero run of hypergeometric odds (leading and trailing zeros omitted).
pub fn calculate_odds_nopad(total: u64, targets: u64, samples: u64) -> OddsTable {
    let mut table = OddsTable::new();
    calculate_odds_nopad_into(&mut table, total, targets, samples);
    table
}

/// Full odds table for `0..=samples` successes.
pub fn calculate_odds(total: u64, targets: u64, samples: u64) -> Vec<f64> {
    let table = calculate_odds_nopad(total, targets, samples);
    (0..=samples).map(|k| table.get(k)).collect()
}

/// Probability that every sample hits a target: `calculate_odds(..)[samples]`
/// in closed form.
pub fn calculate_final_odds(total: u64, targets: u64, samples: u64) -> f64 {
    if samples > targets {
        return 0.0;
    }
    if samples == 0 || targets == total {
        return 1.0;
    }
    if samples == 1 {
        return targets as f64 / total as f64;
    }
    (ln_factorial(total - samples) - ln_factorial(total) + ln_factorial(targets)
        - ln_factorial(targets - samples))
    .exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn assert_table(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_generates_table() {
        let odds = calculate_odds(9, 5, 4);
        assert_table(&odds, &[1.0 / 126.0, 20.0 / 126.0, 60.0 / 126.0, 40.0 / 126.0, 5.0 / 126.0]);
    }

    #[test]
    fn test_exact_for_zero_and_one_sample() {
        assert_eq!(calculate_odds(7, 5, 0), vec![1.0]);
        assert_eq!(calculate_odds(7, 5, 1), vec![2.0 / 7.0, 5.0 / 7.0]);
    }

    #[test]
    fn test_impossible_high_values_are_zero() {
        assert_table(&calculate_odds(7, 2, 4), &[1.0 / 7.0, 4.0 / 7.0, 2.0 / 7.0, 0.0, 0.0]);
        let t = calculate_odds_nopad(7, 2, 4);
        assert_eq!(t.start(), 0);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_impossible_low_values_are_zero() {
        assert_table(&calculate_odds(7, 5, 4), &[0.0, 0.0, 2.0 / 7.0, 4.0 / 7.0, 1.0 / 7.0]);
        let t = calculate_odds_nopad(7, 5, 4);
        assert_eq!(t.start(), 2);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_certainties() {
        // full sampling
        assert_table(&calculate_odds(3, 2, 3), &[0.0, 0.0, 1.0, 0.0]);
        // no targets
        assert_table(&calculate_odds(3, 0, 2), &[1.0, 0.0, 0.0]);
        // saturated targets
        assert_table(&calculate_odds(3, 3, 2), &[0.0, 0.0, 1.0]);
        let t = calculate_odds_nopad(3, 3, 2);
        assert_eq!((t.start(), t.values()), (2, &[1.0][..]));
    }

    #[test]
    fn test_peak() {
        let t = calculate_odds_nopad(9, 5, 4);
        assert_eq!(t.peak(), 2);
        let mut rising = OddsTable::new();
        calculate_odds_nopad_into(&mut rising, 3, 3, 2);
        assert_eq!(rising.peak(), 0);
        assert_eq!(OddsTable::new().peak(), 0);
    }

    #[test]
    fn test_reuses_buffer() {
        let mut t = OddsTable::new();
        calculate_odds_nopad_into(&mut t, 100, 20, 10);
        let cap = t.values.capacity();
        calculate_odds_nopad_into(&mut t, 100, 20, 5);
        assert_eq!(t.values.capacity(), cap);
        assert_eq!(t.len(), 6);
    }

    #[test]
    fn test_final_odds_matches_last_entry() {
        let odds = calculate_odds(100, 20, 10);
        assert_abs_diff_eq!(calculate_final_odds(100, 20, 10), odds[10], epsilon = 1e-6);
        assert_eq!(calculate_final_odds(100, 20, 0), calculate_odds(100, 20, 0)[0]);
        assert_eq!(calculate_final_odds(100, 20, 1), calculate_odds(100, 20, 1)[1]);
        assert_eq!(calculate_final_odds(7, 2, 4), 0.0);
        assert_eq!(calculate_final_odds(7, 7, 4), 1.0);
    }

    #[test]
    fn test_large_population() {
        // one winner per 2,500 tickets, 5,000 tickets drawn from 10^7
        let odds = calculate_odds_nopad(10_000_000, 4_000, 5_000);
        let sum: f64 = odds.values().iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        let mean: f64 =
            odds.values().iter().enumerate().map(|(i, p)| (i as f64 + odds.start() as f64) * p).sum();
        assert_abs_diff_eq!(mean, 2.0, epsilon = 1e-4);
        // tails far below f64 range are trimmed
        assert!(odds.len() < 400);
    }

    #[test]
    fn test_balanced_draw_does_not_underflow() {
        // p(0) = 1 / C(3000, 1500) is far below f64::MIN_POSITIVE
        let odds = calculate_odds_nopad(3_000, 1_500, 1_500);
        assert!(odds.start() > 0);
        let sum: f64 = odds.values().iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
        assert_eq!(odds.start() as usize + odds.peak(), 750);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn prop_odds_sum_to_one(total in 1u64..3_000, t in 0.0f64..=1.0, s in 0.0f64..=1.0) {
            let targets = ((total as f64) * t).floor() as u64;
            let samples = ((total as f64) * s).floor() as u64;
            let sum: f64 = calculate_odds(total, targets, samples).iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-6, "sum={} for ({}, {}, {})", sum, total, targets, samples);
        }

        #[test]
        fn prop_final_odds_match(total in 2u64..2_000, t in 0.0f64..=1.0, s in 0.0f64..=0.1) {
            let targets = ((total as f64) * t).floor() as u64;
            let samples = ((total as f64) * s).floor() as u64;
            let odds = calculate_odds(total, targets, samples);
            let last = odds[samples as usize];
            let fin = calculate_final_odds(total, targets, samples);
            prop_assert!((last - fin).abs() <= 1e-9 + 1e-6 * fin, "{} vs {}", last, fin);
        }
    }
}
