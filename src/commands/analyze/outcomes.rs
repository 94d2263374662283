use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::compare::{McNemarResult, Outcome, StagePairTest, compare_binary_paired};
use crate::config::AnalysisConfig;
use crate::model::AppRecord;
use crate::stage::Stage;

const MCNEMAR_PAIRS: [(Stage, Stage); 4] = [
    (Stage::WithoutIr, Stage::WithIr),
    (Stage::WithIr, Stage::WithIrCorrected),
    (Stage::WithOverrides, Stage::WithOverridesCorrected),
    (Stage::WithIr, Stage::WithOverrides),
];

type FlagReader = fn(&AppRecord) -> bool;

const FLAGS: [(&str, FlagReader); 5] = [
    ("manifests_renderable", |record| record.manifests_renderable),
    ("deployment_successful", |record| record.deployment_successful),
    ("pods_ready", |record| record.pods_ready),
    ("services_accessible", |record| record.services_accessible),
    ("expected_behaviour", |record| record.expected_behaviour),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagRate {
    pub flag: &'static str,
    pub passed: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSuccess {
    pub stage: Stage,
    pub label: &'static str,
    pub apps: usize,
    pub fully_successful: usize,
    pub success_pct: f64,
    pub flags: Vec<FlagRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSection {
    pub success_rates: Vec<StageSuccess>,
    pub mcnemar: Vec<StagePairTest<McNemarResult>>,
}

pub fn analyze_outcomes(records: &[AppRecord], config: &AnalysisConfig) -> OutcomeSection {
    let mut by_stage: BTreeMap<Stage, Vec<&AppRecord>> = BTreeMap::new();
    for record in records {
        by_stage.entry(record.stage).or_default().push(record);
    }

    let success_rates: Vec<StageSuccess> = by_stage
        .iter()
        .map(|(stage, rows)| stage_success(*stage, rows))
        .collect();
    for row in &success_rates {
        info!(
            stage = %row.stage,
            apps = row.apps,
            success_pct = %format!("{:.1}", row.success_pct),
            "full-success rate"
        );
    }

    let mcnemar = MCNEMAR_PAIRS
        .into_iter()
        .map(|(baseline, candidate)| {
            let outcome = match (by_stage.get(&baseline), by_stage.get(&candidate)) {
                (None, _) => Outcome::MissingStage { stage: baseline },
                (_, None) => Outcome::MissingStage { stage: candidate },
                (Some(before), Some(after)) => {
                    compare_binary_paired(&success_by_app(before), &success_by_app(after), config.alpha)
                }
            };
            match &outcome {
                Outcome::Computed(result) => info!(
                    baseline = %baseline,
                    candidate = %candidate,
                    gained = result.gained,
                    lost = result.lost,
                    p_value = result.p_value,
                    "mcnemar"
                ),
                other => warn!(
                    baseline = %baseline,
                    candidate = %candidate,
                    reason = %other.skip_reason().unwrap_or_default(),
                    "mcnemar skipped"
                ),
            }
            StagePairTest {
                baseline,
                candidate,
                outcome,
            }
        })
        .collect();

    OutcomeSection {
        success_rates,
        mcnemar,
    }
}

fn stage_success(stage: Stage, rows: &[&AppRecord]) -> StageSuccess {
    let apps = rows.len();
    let pct = |count: usize| count as f64 / apps as f64 * 100.0;
    let fully_successful = rows.iter().filter(|record| record.fully_successful()).count();

    let flags = FLAGS
        .iter()
        .map(|&(flag, read)| {
            let passed = rows.iter().filter(|record| read(record)).count();
            FlagRate {
                flag,
                passed,
                pct: pct(passed),
            }
        })
        .collect();

    StageSuccess {
        stage,
        label: stage.label(),
        apps,
        fully_successful,
        success_pct: pct(fully_successful),
        flags,
    }
}

fn success_by_app(rows: &[&AppRecord]) -> BTreeMap<String, bool> {
    rows.iter()
        .map(|record| (record.app.clone(), record.fully_successful()))
        .collect()
}
