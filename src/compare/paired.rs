use std::collections::BTreeMap;

use serde::Serialize;

use super::{Hypothesis, Outcome, TestMethod, ZeroPolicy, align_by_key, select_p_value};
use crate::stats::distribution::{discrete_tails, normal_cdf, normal_sf, signed_rank_counts};
use crate::stats::quantile;
use crate::stats::rank::{average_ranks, tie_correction_term, tie_group_sizes};

const EXACT_MAX_PAIRS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedConfig {
    pub min_pairs: usize,
    pub zero_policy: ZeroPolicy,
    pub hypothesis: Hypothesis,
    pub alpha: f64,
}

impl Default for PairedConfig {
    fn default() -> Self {
        Self {
            min_pairs: 3,
            zero_policy: ZeroPolicy::Exclude,
            hypothesis: Hypothesis::TwoSided,
            alpha: 0.05,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Decrease,
    Increase,
    Unchanged,
}

/// Deltas are reported as `b - a`; a uniform decrease has effect size 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedComparison {
    pub n_pairs: usize,
    pub n_nonzero: usize,
    pub hypothesis: Hypothesis,
    pub zero_policy: ZeroPolicy,
    pub method: TestMethod,
    pub statistic: f64,
    pub z_score: Option<f64>,
    pub p_value: f64,
    pub significant: bool,
    pub effect_size: f64,
    pub median_delta: f64,
    pub q1_delta: f64,
    pub q3_delta: f64,
    pub decreased: usize,
    pub increased: usize,
    pub unchanged: usize,
    pub direction: Direction,
}

pub fn compare_paired(
    a: &BTreeMap<String, f64>,
    b: &BTreeMap<String, f64>,
    config: &PairedConfig,
) -> Outcome<PairedComparison> {
    let pairs = align_by_key(a, b);
    if pairs.len() < config.min_pairs {
        return Outcome::InsufficientData {
            observed: pairs.len(),
            required: config.min_pairs,
        };
    }

    let differences: Vec<f64> = pairs.iter().map(|(_, before, after)| before - after).collect();
    let deltas: Vec<f64> = differences.iter().map(|d| -d).collect();

    let decreased = differences.iter().filter(|d| **d > 0.0).count();
    let increased = differences.iter().filter(|d| **d < 0.0).count();
    let unchanged = differences.len() - decreased - increased;

    let test = match signed_rank(&differences, config.zero_policy, config.hypothesis) {
        Ok(test) => test,
        Err(reason) => return Outcome::degenerate(reason),
    };

    let (Some(median_delta), Some(q1_delta), Some(q3_delta)) = (
        quantile(&deltas, 0.5),
        quantile(&deltas, 0.25),
        quantile(&deltas, 0.75),
    ) else {
        return Outcome::degenerate("paired deltas are empty");
    };

    let effect_size = (decreased as f64 - increased as f64) / (decreased + increased) as f64;
    let direction = if median_delta < 0.0 {
        Direction::Decrease
    } else if median_delta > 0.0 {
        Direction::Increase
    } else {
        Direction::Unchanged
    };

    Outcome::Computed(PairedComparison {
        n_pairs: pairs.len(),
        n_nonzero: test.n_nonzero,
        hypothesis: config.hypothesis,
        zero_policy: config.zero_policy,
        method: test.method,
        statistic: test.statistic,
        z_score: test.z_score,
        p_value: test.p_value,
        significant: test.p_value < config.alpha,
        effect_size,
        median_delta,
        q1_delta,
        q3_delta,
        decreased,
        increased,
        unchanged,
        direction,
    })
}

struct SignedRank {
    statistic: f64,
    p_value: f64,
    method: TestMethod,
    z_score: Option<f64>,
    n_nonzero: usize,
}

fn signed_rank(
    differences: &[f64],
    zero_policy: ZeroPolicy,
    hypothesis: Hypothesis,
) -> Result<SignedRank, String> {
    let n_zero = differences.iter().filter(|d| **d == 0.0).count();
    let n_nonzero = differences.len() - n_zero;
    if n_nonzero == 0 {
        return Err("all paired differences are zero".to_string());
    }

    let ranked: Vec<f64> = match zero_policy {
        ZeroPolicy::Exclude => differences.iter().copied().filter(|d| *d != 0.0).collect(),
        ZeroPolicy::Pratt => differences.to_vec(),
    };
    let magnitudes: Vec<f64> = ranked.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&magnitudes);

    let mut r_plus = 0.0;
    let mut r_minus = 0.0;
    for (difference, rank) in ranked.iter().zip(&ranks) {
        if *difference > 0.0 {
            r_plus += rank;
        } else if *difference < 0.0 {
            r_minus += rank;
        }
    }

    let statistic = match hypothesis {
        Hypothesis::TwoSided => f64::min(r_plus, r_minus),
        Hypothesis::Decrease | Hypothesis::Increase => r_plus,
    };

    let zeros_ranked = zero_policy == ZeroPolicy::Pratt && n_zero > 0;
    let has_ties = tie_group_sizes(&magnitudes).iter().any(|size| *size > 1);
    if !zeros_ranked && !has_ties && n_nonzero <= EXACT_MAX_PAIRS {
        let counts = signed_rank_counts(n_nonzero);
        let (upper, lower) = discrete_tails(&counts, r_plus.round() as usize);
        return Ok(SignedRank {
            statistic,
            p_value: select_p_value(hypothesis, upper, lower),
            method: TestMethod::Exact,
            z_score: None,
            n_nonzero,
        });
    }

    let n = ranked.len() as f64;
    let mut mean = n * (n + 1.0) / 4.0;
    let mut variance = n * (n + 1.0) * (2.0 * n + 1.0);
    if zeros_ranked {
        let zeros = n_zero as f64;
        mean -= zeros * (zeros + 1.0) / 4.0;
        variance -= zeros * (zeros + 1.0) * (2.0 * zeros + 1.0);
    }
    let nonzero_magnitudes: Vec<f64> = magnitudes
        .iter()
        .copied()
        .filter(|magnitude| *magnitude != 0.0)
        .collect();
    variance -= 0.5 * tie_correction_term(&nonzero_magnitudes);
    let standard_error = (variance / 24.0).sqrt();
    if !standard_error.is_finite() || standard_error <= 0.0 {
        return Err("signed ranks have zero variance".to_string());
    }

    let z = (r_plus - mean) / standard_error;
    Ok(SignedRank {
        statistic,
        p_value: select_p_value(hypothesis, normal_sf(z), normal_cdf(z)),
        method: TestMethod::NormalApproximation,
        z_score: Some(z),
        n_nonzero,
    })
}
