use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::compare::{
    Hypothesis, Outcome, PairedComparison, StagePairTest, UnpairedComparison, compare_paired,
    compare_unpaired,
};
use crate::config::AnalysisConfig;
use crate::model::AppRecord;
use crate::stage::Stage;
use crate::stats::{mean, median, sample_std};

const UNPAIRED_PAIRS: [(Stage, Stage); 6] = [
    (Stage::WithoutIr, Stage::WithIr),
    (Stage::WithoutIr, Stage::WithOverrides),
    (Stage::WithIr, Stage::WithIrCorrected),
    (Stage::WithOverrides, Stage::WithOverridesCorrected),
    (Stage::WithIr, Stage::WithOverrides),
    (Stage::WithIrCorrected, Stage::WithOverridesCorrected),
];

const PAIRED: (Stage, Stage) = (Stage::WithIr, Stage::WithIrCorrected);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSecurity {
    pub stage: Stage,
    pub label: &'static str,
    pub count: usize,
    pub mean_ratio: f64,
    pub median_ratio: f64,
    pub std_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecuritySection {
    pub scanned_apps: usize,
    pub per_stage: Vec<StageSecurity>,
    pub unpaired: Vec<StagePairTest<UnpairedComparison>>,
    pub paired: StagePairTest<PairedComparison>,
}

fn misconfiguration_ratios(records: &[AppRecord]) -> BTreeMap<Stage, BTreeMap<String, f64>> {
    let mut ratios: BTreeMap<Stage, BTreeMap<String, f64>> = BTreeMap::new();
    for record in records {
        if record.kubescape_total_controls == 0 {
            continue;
        }
        let ratio = record.kubescape_failed() as f64 / record.kubescape_total_controls as f64;
        ratios
            .entry(record.stage)
            .or_default()
            .insert(record.app.clone(), ratio);
    }
    ratios
}

pub fn analyze_security(records: &[AppRecord], config: &AnalysisConfig) -> SecuritySection {
    let ratios = misconfiguration_ratios(records);
    let scanned_apps: usize = ratios.values().map(BTreeMap::len).sum();
    info!(scanned_apps, stages = ratios.len(), "loaded misconfiguration ratios");

    let per_stage = ratios
        .iter()
        .filter_map(|(stage, by_app)| {
            let values: Vec<f64> = by_app.values().copied().collect();
            Some(StageSecurity {
                stage: *stage,
                label: stage.label(),
                count: values.len(),
                mean_ratio: mean(&values)?,
                median_ratio: median(&values)?,
                std_ratio: sample_std(&values),
            })
        })
        .collect();

    let unpaired = UNPAIRED_PAIRS
        .into_iter()
        .map(|(baseline, candidate)| {
            let outcome = match (ratios.get(&baseline), ratios.get(&candidate)) {
                (None, _) => Outcome::MissingStage { stage: baseline },
                (_, None) => Outcome::MissingStage { stage: candidate },
                (Some(before), Some(after)) => {
                    let before: Vec<f64> = before.values().copied().collect();
                    let after: Vec<f64> = after.values().copied().collect();
                    compare_unpaired(&before, &after, &config.unpaired())
                }
            };
            match &outcome {
                Outcome::Computed(result) => info!(
                    baseline = %baseline,
                    candidate = %candidate,
                    u = result.u_statistic,
                    p_value = result.p_value,
                    rank_biserial = result.rank_biserial,
                    significant = result.significant,
                    "misconfiguration ratio mann-whitney"
                ),
                other => warn!(
                    baseline = %baseline,
                    candidate = %candidate,
                    reason = %other.skip_reason().unwrap_or_default(),
                    "misconfiguration ratio mann-whitney skipped"
                ),
            }
            StagePairTest {
                baseline,
                candidate,
                outcome,
            }
        })
        .collect();

    let (baseline, candidate) = PAIRED;
    let outcome = match (ratios.get(&baseline), ratios.get(&candidate)) {
        (None, _) => Outcome::MissingStage { stage: baseline },
        (_, None) => Outcome::MissingStage { stage: candidate },
        (Some(before), Some(after)) => {
            compare_paired(before, after, &config.paired(Hypothesis::TwoSided))
        }
    };
    match &outcome {
        Outcome::Computed(result) => info!(
            baseline = %baseline,
            candidate = %candidate,
            n_pairs = result.n_pairs,
            improved = result.decreased,
            worsened = result.increased,
            unchanged = result.unchanged,
            median_delta = result.median_delta,
            p_value = result.p_value,
            "paired misconfiguration ratio"
        ),
        other => warn!(
            baseline = %baseline,
            candidate = %candidate,
            reason = %other.skip_reason().unwrap_or_default(),
            "paired misconfiguration ratio skipped"
        ),
    }

    SecuritySection {
        scanned_apps,
        per_stage,
        unpaired,
        paired: StagePairTest {
            baseline,
            candidate,
            outcome,
        },
    }
}
