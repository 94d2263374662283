use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

mod mcnemar;
mod outcome;
mod paired;
mod unpaired;

#[cfg(test)]
mod tests;

pub use mcnemar::{McNemarResult, compare_binary_paired};
pub use outcome::Outcome;
pub use paired::{PairedComparison, PairedConfig, compare_paired};
pub use unpaired::{UnpairedComparison, UnpairedConfig, compare_unpaired};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hypothesis {
    TwoSided,
    Decrease,
    Increase,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPolicy {
    #[default]
    Exclude,
    Pratt,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMethod {
    Exact,
    NormalApproximation,
}

fn select_p_value(hypothesis: Hypothesis, upper: f64, lower: f64) -> f64 {
    match hypothesis {
        Hypothesis::TwoSided => (2.0 * upper.min(lower)).min(1.0),
        Hypothesis::Decrease => upper,
        Hypothesis::Increase => lower,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagePairTest<T> {
    pub baseline: Stage,
    pub candidate: Stage,
    pub outcome: Outcome<T>,
}

pub fn align_by_key<T: Copy>(
    a: &BTreeMap<String, T>,
    b: &BTreeMap<String, T>,
) -> Vec<(String, T, T)> {
    a.iter()
        .filter_map(|(key, left)| b.get(key).map(|right| (key.clone(), *left, *right)))
        .collect()
}
