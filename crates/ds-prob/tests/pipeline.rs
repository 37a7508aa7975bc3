//! End-to-end checks across odds, builder, algebra and codec.

use approx::assert_abs_diff_eq;
use statrs::distribution::{Discrete, Hypergeometric};

use ds_core::PrizeTier;
use ds_prob::{
    calculate_odds, calculate_probability_map, extract_cumulative_probability, make_pmap, mult, pow,
};

#[test]
fn odds_agree_with_statrs() {
    for &(total, targets, samples) in &[(50u64, 10u64, 7u64), (200, 37, 60), (1_000, 12, 30)] {
        let odds = calculate_odds(total, targets, samples);
        let reference = Hypergeometric::new(total, targets, samples).unwrap();
        for (k, &p) in odds.iter().enumerate() {
            assert_abs_diff_eq!(p, reference.pmf(k as u64), epsilon = 1e-9);
        }
    }
}

#[test]
fn single_tier_matches_hypergeometric() {
    // winnings are value * (number of winning tickets)
    let prizes = vec![PrizeTier::new(25, 40), PrizeTier::new(0, 960)];
    let m = calculate_probability_map(&prizes, 30, 0.0).unwrap();
    let reference = Hypergeometric::new(1_000, 40, 30).unwrap();
    for k in 0..=30u64 {
        let p = m.get(25 * k).unwrap_or(0.0);
        assert_abs_diff_eq!(p, reference.pmf(k), epsilon = 1e-9);
    }
}

#[test]
fn extracted_mean_matches_expected_winnings() {
    let prizes = vec![
        PrizeTier::new(1_000, 3),
        PrizeTier::new(100, 20),
        PrizeTier::new(25, 200),
        PrizeTier::new(0, 9_777),
    ];
    let tickets = 40;
    let m = calculate_probability_map(&prizes, tickets, 0.0).unwrap();
    let out = extract_cumulative_probability(&m, 0.0);
    assert_abs_diff_eq!(out.total_p, 1.0, epsilon = 1e-9);

    // linearity of expectation: each ticket is worth total_value / audience
    let expected = tickets as f64 * (3_000.0 + 2_000.0 + 5_000.0) / 10_000.0;
    assert_abs_diff_eq!(out.distribution.mean(), expected, epsilon = 1e-6);
}

#[test]
fn pow_agrees_with_repeated_mult() {
    let prizes = vec![PrizeTier::new(50, 2), PrizeTier::new(10, 5), PrizeTier::new(0, 93)];
    let single = calculate_probability_map(&prizes, 4, 0.0).unwrap();
    let cubed = pow(&single, 3, 0.0);

    let two = mult(Some(&single), Some(&single), 0.0).unwrap();
    let three = mult(Some(two.as_ref()), Some(&single), 0.0).unwrap();

    assert_eq!(cubed.len(), three.len());
    for (&value, &p) in three.iter() {
        assert_abs_diff_eq!(cubed.get(value).unwrap(), p, epsilon = 1e-12);
    }
}

#[test]
fn wire_round_trip_preserves_distribution() {
    let prizes = vec![PrizeTier::new(100, 3), PrizeTier::new(5, 17), PrizeTier::new(0, 480)];
    let m = calculate_probability_map(&prizes, 12, 0.0).unwrap();
    let dist = extract_cumulative_probability(&m, 0.0).distribution;
    let back = make_pmap(&dist);
    assert_eq!(back.len(), m.len());
    for (&value, &p) in m.iter() {
        assert_abs_diff_eq!(back.get(value).unwrap(), p, epsilon = 1e-12);
    }
}
