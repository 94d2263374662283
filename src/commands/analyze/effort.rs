use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::compare::{Hypothesis, Outcome, PairedComparison, compare_paired};
use crate::config::AnalysisConfig;
use crate::model::AppRecord;
use crate::stage::Stage;
use crate::stats::{Correlation, LinearFit, Summary, describe, linear_fit, mean, spearman};

const CORRECTION_PAIRS: [(Stage, Stage); 2] = [
    (Stage::WithIr, Stage::WithIrCorrected),
    (Stage::WithOverrides, Stage::WithOverridesCorrected),
];

const TOP_APPS: usize = 20;

/// Upper bounds (inclusive) of the cluster-size buckets; the last is open.
const SIZE_BUCKETS: [(&str, Option<u64>); 5] = [
    ("<100", Some(100)),
    ("100-500", Some(500)),
    ("500-1K", Some(1_000)),
    ("1K-5K", Some(5_000)),
    (">5K", None),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffortSummary {
    pub added_lines: Option<Summary>,
    pub removed_lines: Option<Summary>,
    pub modified_lines: Option<Summary>,
    pub total_operations: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionEffort {
    pub baseline: Stage,
    pub corrected: Stage,
    pub apps: usize,
    pub summary: EffortSummary,
    pub total_operations: Outcome<PairedComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageCorrelation {
    pub stage: Stage,
    pub n: usize,
    pub correlation: Option<Correlation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMean {
    pub stage: Stage,
    pub n: usize,
    pub mean_operations: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeBucket {
    pub label: &'static str,
    pub n: usize,
    pub mean_operations: Option<f64>,
    pub by_stage: Vec<StageMean>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopApp {
    pub stage: Stage,
    pub app: String,
    pub total_operations: u64,
    pub cluster_lines: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterEffort {
    pub n: usize,
    pub overall: Option<Correlation>,
    pub per_stage: Vec<StageCorrelation>,
    pub power_law: Option<LinearFit>,
    pub size_buckets: Vec<SizeBucket>,
    pub top_apps: Vec<TopApp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffortSection {
    pub corrections: Vec<CorrectionEffort>,
    pub cluster: Option<ClusterEffort>,
}

pub fn analyze_effort(records: &[AppRecord], config: &AnalysisConfig) -> EffortSection {
    let corrections = CORRECTION_PAIRS
        .into_iter()
        .map(|(baseline, corrected)| correction_effort(records, baseline, corrected, config))
        .collect();

    EffortSection {
        corrections,
        cluster: cluster_effort(records),
    }
}

fn stage_rows(records: &[AppRecord], stage: Stage) -> Vec<&AppRecord> {
    records.iter().filter(|record| record.stage == stage).collect()
}

fn correction_effort(
    records: &[AppRecord],
    baseline: Stage,
    corrected: Stage,
    config: &AnalysisConfig,
) -> CorrectionEffort {
    let base_rows = stage_rows(records, baseline);
    let corrected_rows = stage_rows(records, corrected);

    let column = |read: fn(&AppRecord) -> u64| -> Option<Summary> {
        let values: Vec<f64> = corrected_rows.iter().map(|record| read(record) as f64).collect();
        describe(&values)
    };
    let summary = EffortSummary {
        added_lines: column(|record: &AppRecord| record.added_lines),
        removed_lines: column(|record: &AppRecord| record.removed_lines),
        modified_lines: column(|record: &AppRecord| record.modified_lines),
        total_operations: column(|record: &AppRecord| record.total_operations),
    };

    let total_operations = if base_rows.is_empty() {
        Outcome::MissingStage { stage: baseline }
    } else if corrected_rows.is_empty() {
        Outcome::MissingStage { stage: corrected }
    } else {
        compare_paired(
            &operations_by_app(&base_rows),
            &operations_by_app(&corrected_rows),
            &config.paired(Hypothesis::TwoSided),
        )
    };

    match &total_operations {
        Outcome::Computed(result) => info!(
            baseline = %baseline,
            corrected = %corrected,
            n_pairs = result.n_pairs,
            median_delta = result.median_delta,
            p_value = result.p_value,
            "human effort comparison"
        ),
        other => warn!(
            baseline = %baseline,
            corrected = %corrected,
            reason = %other.skip_reason().unwrap_or_default(),
            "human effort comparison skipped"
        ),
    }

    CorrectionEffort {
        baseline,
        corrected,
        apps: corrected_rows.len(),
        summary,
        total_operations,
    }
}

fn operations_by_app(rows: &[&AppRecord]) -> BTreeMap<String, f64> {
    rows.iter()
        .map(|record| (record.app.clone(), record.total_operations as f64))
        .collect()
}

fn cluster_effort(records: &[AppRecord]) -> Option<ClusterEffort> {
    let corrected_stages = CORRECTION_PAIRS.map(|(_, corrected)| corrected);
    let rows: Vec<&AppRecord> = records
        .iter()
        .filter(|record| corrected_stages.contains(&record.stage))
        .filter(|record| record.cluster_lines > 0 && record.total_operations > 0)
        .collect();
    if rows.is_empty() {
        warn!("no corrected applications with both cluster size and effort");
        return None;
    }

    let lines: Vec<f64> = rows.iter().map(|record| record.cluster_lines as f64).collect();
    let ops: Vec<f64> = rows.iter().map(|record| record.total_operations as f64).collect();
    let overall = spearman(&lines, &ops);

    let per_stage = corrected_stages
        .into_iter()
        .map(|stage| {
            let (lines, ops): (Vec<f64>, Vec<f64>) = rows
                .iter()
                .filter(|record| record.stage == stage)
                .map(|record| (record.cluster_lines as f64, record.total_operations as f64))
                .unzip();
            StageCorrelation {
                stage,
                n: lines.len(),
                correlation: spearman(&lines, &ops),
            }
        })
        .collect();

    let log_lines: Vec<f64> = lines.iter().map(|value| value.log10()).collect();
    let log_ops: Vec<f64> = ops.iter().map(|value| value.log10()).collect();
    let power_law = linear_fit(&log_lines, &log_ops);

    match (&overall, &power_law) {
        (Some(correlation), Some(fit)) => info!(
            n = rows.len(),
            rho = correlation.rho,
            p_value = correlation.p_value,
            slope = fit.slope,
            r_squared = fit.r_squared,
            "effort vs cluster size"
        ),
        _ => info!(n = rows.len(), "effort vs cluster size correlation undefined"),
    }

    Some(ClusterEffort {
        n: rows.len(),
        overall,
        per_stage,
        power_law,
        size_buckets: size_buckets(&rows, &corrected_stages),
        top_apps: top_apps(&rows),
    })
}

fn bucket_index(cluster_lines: u64) -> usize {
    SIZE_BUCKETS
        .iter()
        .position(|(_, upper)| upper.is_none_or(|upper| cluster_lines <= upper))
        .unwrap_or(SIZE_BUCKETS.len() - 1)
}

fn size_buckets(rows: &[&AppRecord], stages: &[Stage]) -> Vec<SizeBucket> {
    let mut grouped: Vec<Vec<&AppRecord>> = vec![Vec::new(); SIZE_BUCKETS.len()];
    for record in rows {
        grouped[bucket_index(record.cluster_lines)].push(*record);
    }

    SIZE_BUCKETS
        .iter()
        .zip(grouped)
        .map(|(&(label, _), members)| {
            let ops = |stage: Option<Stage>| -> Vec<f64> {
                members
                    .iter()
                    .filter(|record| stage.is_none_or(|stage| record.stage == stage))
                    .map(|record| record.total_operations as f64)
                    .collect()
            };
            let by_stage = stages
                .iter()
                .filter_map(|stage| {
                    let values = ops(Some(*stage));
                    mean(&values).map(|mean_operations| StageMean {
                        stage: *stage,
                        n: values.len(),
                        mean_operations,
                    })
                })
                .collect();
            SizeBucket {
                label,
                n: members.len(),
                mean_operations: mean(&ops(None)),
                by_stage,
            }
        })
        .collect()
}

fn top_apps(rows: &[&AppRecord]) -> Vec<TopApp> {
    let mut ranked: Vec<&AppRecord> = rows.to_vec();
    ranked.sort_by(|a, b| {
        b.total_operations
            .cmp(&a.total_operations)
            .then_with(|| a.stage.cmp(&b.stage))
            .then_with(|| a.app.cmp(&b.app))
    });
    ranked
        .into_iter()
        .take(TOP_APPS)
        .map(|record| TopApp {
            stage: record.stage,
            app: record.app.clone(),
            total_operations: record.total_operations,
            cluster_lines: record.cluster_lines,
        })
        .collect()
}
