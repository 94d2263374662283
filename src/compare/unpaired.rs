use serde::Serialize;

use super::{Hypothesis, Outcome, TestMethod, select_p_value};
use crate::stats::distribution::{discrete_tails, normal_cdf, normal_sf, rank_sum_counts};
use crate::stats::median;
use crate::stats::rank::{average_ranks, tie_correction_term, tie_group_sizes};

const EXACT_MAX_GROUP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnpairedConfig {
    pub min_group_size: usize,
    pub hypothesis: Hypothesis,
    pub alpha: f64,
}

impl Default for UnpairedConfig {
    fn default() -> Self {
        Self {
            min_group_size: 2,
            hypothesis: Hypothesis::TwoSided,
            alpha: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnpairedComparison {
    pub n1: usize,
    pub n2: usize,
    pub hypothesis: Hypothesis,
    pub method: TestMethod,
    pub u_statistic: f64,
    pub z_score: Option<f64>,
    pub p_value: f64,
    pub significant: bool,
    pub rank_biserial: f64,
    pub median_a: f64,
    pub median_b: f64,
    /// median(b) - median(a)
    pub median_difference: f64,
}

pub fn compare_unpaired(
    a: &[f64],
    b: &[f64],
    config: &UnpairedConfig,
) -> Outcome<UnpairedComparison> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < config.min_group_size || n2 < config.min_group_size {
        return Outcome::InsufficientData {
            observed: n1.min(n2),
            required: config.min_group_size,
        };
    }

    let combined: Vec<f64> = a.iter().chain(b).copied().collect();
    if tie_group_sizes(&combined).len() <= 1 {
        return Outcome::degenerate("all observations are tied");
    }

    let ranks = average_ranks(&combined);
    let rank_sum_a: f64 = ranks[..n1].iter().sum();
    let u1 = rank_sum_a - (n1 * (n1 + 1)) as f64 / 2.0;
    let product = (n1 * n2) as f64;
    let tie_term = tie_correction_term(&combined);

    let exact = n1 <= EXACT_MAX_GROUP && n2 <= EXACT_MAX_GROUP && tie_term == 0.0;
    let (method, z_score, p_value) = if exact {
        let counts = rank_sum_counts(n1, n2);
        let (upper, lower) = discrete_tails(&counts, u1.round() as usize);
        (
            TestMethod::Exact,
            None,
            select_p_value(config.hypothesis, upper, lower),
        )
    } else {
        let n = (n1 + n2) as f64;
        let mean = product / 2.0;
        let sigma = (product / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
        if !sigma.is_finite() || sigma <= 0.0 {
            return Outcome::degenerate("rank sums have zero variance");
        }
        let upper = normal_sf((u1 - mean - 0.5) / sigma);
        let lower = normal_cdf((u1 - mean + 0.5) / sigma);
        (
            TestMethod::NormalApproximation,
            Some((u1 - mean) / sigma),
            select_p_value(config.hypothesis, upper, lower),
        )
    };

    let (Some(median_a), Some(median_b)) = (median(a), median(b)) else {
        return Outcome::degenerate("empty sample");
    };

    Outcome::Computed(UnpairedComparison {
        n1,
        n2,
        hypothesis: config.hypothesis,
        method,
        u_statistic: u1,
        z_score,
        p_value,
        significant: p_value < config.alpha,
        rank_biserial: 1.0 - 2.0 * u1 / product,
        median_a,
        median_b,
        median_difference: median_b - median_a,
    })
}
