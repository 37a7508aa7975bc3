//! Log-factorials for counts up to (and beyond) 10^9.

use std::sync::OnceLock;

/// Below this, `ln(n!)` is an exact running sum of logs.
const EXACT_COUNT: usize = 257;

/// Below this, values are served from the lookup table.
const CACHE_COUNT: usize = 262_144;

/// `0.5 * ln(2π)`
const HALF_LN_TWO_PI: f64 = 0.918_938_533_204_672_8;

/// Stirling series for `ln Γ(x)`.
///
/// The first correction term is enough: at `x = 258` the next term is
/// below 2e-10.
#[inline]
fn stirling(x: f64) -> f64 {
    let lnx = x.ln();
    1.0 / (12.0 * x) - 0.5 * lnx + x * (lnx - 1.0) + HALF_LN_TWO_PI
}

fn table() -> &'static [f64] {
    static TABLE: OnceLock<Vec<f64>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut lookup = vec![0.0; CACHE_COUNT];
        for i in 2..EXACT_COUNT {
            lookup[i] = lookup[i - 1] + (i as f64).ln();
        }
        for (i, v) in lookup.iter_mut().enumerate().skip(EXACT_COUNT) {
            *v = stirling(i as f64 + 1.0);
        }
        lookup
    })
}

/// `ln(n!)`.
#[inline]
pub fn ln_factorial(n: u64) -> f64 {
    match usize::try_from(n) {
        Ok(i) if i < CACHE_COUNT => table()[i],
        _ => stirling(n as f64 + 1.0),
    }
}
