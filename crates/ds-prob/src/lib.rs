//! Probability engine for drawstat.
//!
//! - `factorial`: log-factorials (exact table + Stirling series)
//! - `odds`: hypergeometric odds tables
//! - `pmap`: sparse value → probability maps
//! - `builder`: winnings distribution for N tickets (row-by-row DP)
//! - `algebra`: convolution, exponentiation and compounding of maps
//! - `codec`: sparse map ⇄ dense cumulative buffer

pub mod algebra;
pub mod builder;
pub mod codec;
pub mod factorial;
pub mod odds;
pub mod pmap;

pub use algebra::{compound, mult, pow};
pub use builder::{ProbabilityMapBuilder, StageTiming, calculate_probability_map};
pub use codec::{Extracted, extract_cumulative_probability, make_pmap};
pub use factorial::ln_factorial;
pub use odds::{
    OddsTable, calculate_final_odds, calculate_odds, calculate_odds_nopad, calculate_odds_nopad_into,
};
pub use pmap::ProbabilityMap;
