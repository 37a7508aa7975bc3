//! Probability map algebra: convolution, exponentiation, compounding.

use std::borrow::Cow;

use ds_core::CompoundPart;

use crate::pmap::ProbabilityMap;

/// Distribution of `A + B` for independent `A`, `B`.
///
/// A missing operand acts as the identity: `mult(Some(x), None) == x`
/// (borrowed, not copied) and `mult(None, None) == None`. Products at or
/// below `p_cutoff` are dropped.
pub fn mult<'a>(
    a: Option<&'a ProbabilityMap>,
    b: Option<&'a ProbabilityMap>,
    p_cutoff: f64,
) -> Option<Cow<'a, ProbabilityMap>> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(Cow::Borrowed(x)),
        (Some(a), Some(b)) => Some(Cow::Owned(convolve(a, b, p_cutoff))),
    }
}

fn convolve(a: &ProbabilityMap, b: &ProbabilityMap, p_cutoff: f64) -> ProbabilityMap {
    let mut m = ProbabilityMap::with_capacity(a.len().max(b.len()));
    for (&av, &ap) in a {
        for (&bv, &bp) in b {
            let p = ap * bp;
            if p > p_cutoff {
                m.accumulate(av + bv, p);
            }
        }
    }
    m
}

/// Distribution of the sum of `power` independent copies (square and
/// multiply).
///
/// `power == 0` gives `{0: 1}`; `power == 1` returns `map` itself.
pub fn pow(map: &ProbabilityMap, power: u32, p_cutoff: f64) -> Cow<'_, ProbabilityMap> {
    if power == 0 {
        return Cow::Owned(ProbabilityMap::unit());
    }

    let mut full: Option<Cow<'_, ProbabilityMap>> = None;
    let mut last: Cow<'_, ProbabilityMap> = Cow::Borrowed(map);
    let mut p = power;
    loop {
        if p & 1 == 1 {
            full = Some(match full {
                None => last.clone(),
                Some(f) => Cow::Owned(convolve(&f, &last, p_cutoff)),
            });
        }
        p >>= 1;
        if p == 0 {
            break;
        }
        last = Cow::Owned(convolve(&last, &last, p_cutoff));
    }
    full.unwrap_or(Cow::Borrowed(map))
}

/// Weighted union of shifted distributions: for each part, mass
/// `part.p * r(v)` lands at `part.value + v`.
pub fn compound(parts: &[CompoundPart], p_cutoff: f64) -> ProbabilityMap {
    let mut m = ProbabilityMap::new();
    for part in parts {
        for e in part.r.entries() {
            let p = part.p * e.p;
            if p > p_cutoff {
                m.accumulate(part.value + e.value as u64, p);
            }
        }
    }
    m
}
