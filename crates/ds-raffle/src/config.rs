//! Prize schedule configuration and its validation.
//!
//! Numbers arrive untyped (JSON/YAML `f64`) and are checked here before
//! anything reaches the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ds_core::{Error, PrizeTier, Result};

/// Largest integer exactly representable as `f64`.
const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

/// One prize tier as written in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrizeSpec {
    /// Prize value in whole currency units.
    pub value: f64,
    /// Number of prizes of this value.
    pub count: f64,
}

impl PrizeSpec {
    /// Tier of `count` prizes worth `value`.
    pub fn new(value: f64, count: f64) -> Self {
        Self { value, count }
    }
}

/// Draw description accepted by [`Raffle::new`](crate::Raffle::new).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaffleConfig {
    /// Total tickets in the draw; defaults to the number of prizes.
    pub audience: Option<f64>,
    /// Audience as a multiple of the number of prizes (ignored when
    /// `audience` is set).
    pub audience_multiplier: Option<f64>,
    /// Prize tiers in any order; equal values are merged.
    pub prizes: Vec<PrizeSpec>,
    /// Default pruning threshold for every task.
    pub p_cutoff: f64,
}

impl RaffleConfig {
    /// Config with an explicit audience.
    pub fn with_audience(audience: f64, prizes: Vec<PrizeSpec>) -> Self {
        Self { audience: Some(audience), prizes, ..Self::default() }
    }
}

/// Validated, normalised schedule: tiers rarest first, filler included.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Schedule {
    pub audience: u64,
    pub prizes: Vec<PrizeTier>,
    pub p_cutoff: f64,
}

/// `x` as a whole number, if it is one.
pub(crate) fn whole(x: f64) -> Option<u64> {
    (x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x <= MAX_EXACT).then_some(x as u64)
}

/// Check a pruning threshold.
pub(crate) fn check_p_cutoff(p_cutoff: f64) -> Result<f64> {
    if p_cutoff.is_finite() && (0.0..1.0).contains(&p_cutoff) {
        Ok(p_cutoff)
    } else {
        Err(Error::validation(format!("Invalid probability cutoff: {p_cutoff}")))
    }
}

impl TryFrom<&RaffleConfig> for Schedule {
    type Error = Error;

    fn try_from(config: &RaffleConfig) -> Result<Self> {
        let mut by_value: BTreeMap<u64, u64> = BTreeMap::new();
        let mut prize_count: u64 = 0;
        for prize in &config.prizes {
            let count = whole(prize.count).ok_or_else(|| Error::validation("Invalid prize count"))?;
            let value = whole(prize.value).ok_or_else(|| Error::validation("Invalid prize value"))?;
            *by_value.entry(value).or_default() += count;
            prize_count = prize_count
                .checked_add(count)
                .ok_or_else(|| Error::validation("Invalid prize count"))?;
        }

        let requested = match (config.audience, config.audience_multiplier) {
            (Some(audience), _) => Some(audience),
            (None, Some(multiplier)) => Some(prize_count as f64 * multiplier),
            (None, None) => None,
        };
        let audience = match requested {
            None => prize_count,
            Some(raw) => {
                let audience = whole(raw).ok_or_else(|| Error::validation("Invalid audience size"))?;
                if prize_count > audience {
                    return Err(Error::validation("Too many prizes"));
                }
                *by_value.entry(0).or_default() += audience - prize_count;
                audience
            }
        };

        let mut prizes: Vec<PrizeTier> = by_value
            .into_iter()
            .filter(|&(_, count)| count > 0)
            .map(|(value, count)| PrizeTier::new(value, count))
            .collect();
        prizes.sort_by_key(|t| (t.count, t.value));

        Ok(Self { audience, prizes, p_cutoff: check_p_cutoff(config.p_cutoff)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prizes(table: &[(f64, f64)]) -> Vec<PrizeSpec> {
        table.iter().map(|&(count, value)| PrizeSpec::new(value, count)).collect()
    }

    fn tiers(table: &[(u64, u64)]) -> Vec<PrizeTier> {
        table.iter().map(|&(count, value)| PrizeTier::new(value, count)).collect()
    }

    fn merge_example() -> Vec<PrizeSpec> {
        prizes(&[(3.0, 7.0), (10.0, 2.0), (2.0, 2.0), (1.0, 0.0)])
    }

    #[test]
    fn test_audience_defaults_to_prize_count() {
        let config = RaffleConfig { prizes: merge_example(), ..RaffleConfig::default() };
        let s = Schedule::try_from(&config).unwrap();
        assert_eq!(s.audience, 16);
        assert_eq!(s.prizes, tiers(&[(1, 0), (3, 7), (12, 2)]));
    }

    #[test]
    fn test_rarity_order() {
        let config = RaffleConfig { prizes: prizes(&[(3.0, 7.0), (10.0, 2.0), (1.0, 0.0)]), ..Default::default() };
        assert_eq!(Schedule::try_from(&config).unwrap().prizes, tiers(&[(1, 0), (3, 7), (10, 2)]));
    }

    #[test]
    fn test_filler_tier() {
        let config = RaffleConfig::with_audience(20.0, merge_example());
        let s = Schedule::try_from(&config).unwrap();
        assert_eq!(s.audience, 20);
        assert_eq!(s.prizes, tiers(&[(3, 7), (5, 0), (12, 2)]));
    }

    #[test]
    fn test_audience_only() {
        let s = Schedule::try_from(&RaffleConfig::with_audience(7.0, vec![])).unwrap();
        assert_eq!(s.audience, 7);
        assert_eq!(s.prizes, tiers(&[(7, 0)]));
    }

    #[test]
    fn test_zero_count_tiers_dropped() {
        let config = RaffleConfig::with_audience(10.0, prizes(&[(0.0, 100.0), (2.0, 5.0)]));
        let s = Schedule::try_from(&config).unwrap();
        assert_eq!(s.prizes, tiers(&[(2, 5), (8, 0)]));
    }

    #[test]
    fn test_ties_ordered_by_value() {
        let config = RaffleConfig { prizes: prizes(&[(4.0, 50.0), (4.0, 10.0), (1.0, 99.0)]), ..Default::default() };
        assert_eq!(Schedule::try_from(&config).unwrap().prizes, tiers(&[(1, 99), (4, 10), (4, 50)]));
    }

    #[test]
    fn test_audience_multiplier() {
        let config = RaffleConfig {
            audience_multiplier: Some(4.0),
            prizes: prizes(&[(2.0, 10.0), (3.0, 5.0)]),
            ..Default::default()
        };
        let s = Schedule::try_from(&config).unwrap();
        assert_eq!(s.audience, 20);
        assert_eq!(s.prizes.last(), Some(&PrizeTier::new(0, 15)));
    }

    #[test]
    fn test_validation_messages() {
        let msg = |config: RaffleConfig| Schedule::try_from(&config).unwrap_err().to_string();

        let negative = RaffleConfig { prizes: prizes(&[(-1.0, 5.0)]), ..Default::default() };
        assert_eq!(msg(negative), "Validation error: Invalid prize count");

        let fractional = RaffleConfig { prizes: prizes(&[(1.5, 5.0)]), ..Default::default() };
        assert_eq!(msg(fractional), "Validation error: Invalid prize count");

        let bad_value = RaffleConfig { prizes: prizes(&[(1.0, 0.25)]), ..Default::default() };
        assert_eq!(msg(bad_value), "Validation error: Invalid prize value");

        assert_eq!(msg(RaffleConfig::with_audience(-1.0, vec![])), "Validation error: Invalid audience size");
        assert_eq!(msg(RaffleConfig::with_audience(f64::NAN, vec![])), "Validation error: Invalid audience size");
        assert_eq!(
            msg(RaffleConfig::with_audience(3.0, prizes(&[(4.0, 1.0)]))),
            "Validation error: Too many prizes"
        );

        let cutoff = RaffleConfig { p_cutoff: 1.0, ..RaffleConfig::with_audience(3.0, vec![]) };
        assert!(msg(cutoff).contains("Invalid probability cutoff"));
    }

    #[test]
    fn test_whole() {
        assert_eq!(whole(0.0), Some(0));
        assert_eq!(whole(12.0), Some(12));
        assert_eq!(whole(-0.5), None);
        assert_eq!(whole(f64::INFINITY), None);
        assert_eq!(whole(1e300), None);
    }

    #[test]
    fn test_deserialise_camel_case() {
        let config: RaffleConfig = serde_json::from_str(
            r#"{"audience": 100, "pCutoff": 1e-12, "prizes": [{"value": 25, "count": 4}]}"#,
        )
        .unwrap();
        assert_eq!(config.audience, Some(100.0));
        assert_eq!(config.p_cutoff, 1e-12);

        let yaml: RaffleConfig =
            serde_yaml_ng::from_str("audienceMultiplier: 3\nprizes:\n  - {value: 5, count: 2}\n").unwrap();
        assert_eq!(yaml.audience_multiplier, Some(3.0));
        assert_eq!(yaml.prizes, vec![PrizeSpec::new(5.0, 2.0)]);
    }
}
