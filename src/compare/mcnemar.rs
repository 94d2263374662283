use std::collections::BTreeMap;

use serde::Serialize;

use super::{Outcome, align_by_key};
use crate::stats::distribution::binomial_cdf_half;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McNemarResult {
    pub n_pairs: usize,
    pub gained: usize,
    pub lost: usize,
    pub both_success: usize,
    pub both_failure: usize,
    pub p_value: f64,
    pub significant: bool,
}

pub fn compare_binary_paired(
    a: &BTreeMap<String, bool>,
    b: &BTreeMap<String, bool>,
    alpha: f64,
) -> Outcome<McNemarResult> {
    let pairs = align_by_key(a, b);
    if pairs.is_empty() {
        return Outcome::InsufficientData {
            observed: 0,
            required: 1,
        };
    }

    let mut result = McNemarResult {
        n_pairs: pairs.len(),
        gained: 0,
        lost: 0,
        both_success: 0,
        both_failure: 0,
        p_value: 1.0,
        significant: false,
    };
    for (_, first, second) in &pairs {
        match (first, second) {
            (true, true) => result.both_success += 1,
            (false, false) => result.both_failure += 1,
            (false, true) => result.gained += 1,
            (true, false) => result.lost += 1,
        }
    }

    let discordant = result.gained + result.lost;
    if discordant == 0 {
        return Outcome::degenerate("no discordant pairs");
    }
    let smaller = result.gained.min(result.lost);
    result.p_value = (2.0 * binomial_cdf_half(discordant, smaller)).min(1.0);
    result.significant = result.p_value < alpha;
    Outcome::Computed(result)
}
