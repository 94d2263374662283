use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compare::{Hypothesis, Outcome, PairedComparison, PairedConfig, compare_paired};
use crate::model::{DriftCategory, DriftDataset};
use crate::stage::Stage;

mod aggregate;
mod classifier;


pub use aggregate::{
    ClassifiedIssue, StageDriftRow, aggregate, error_reduction_rate, per_app_counts,
};
pub use classifier::{ClassifierPolicy, FALLBACK_RULE, RULES, classify_with_rule};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriftConfig {
    pub policy: ClassifierPolicy,
    pub baseline: Stage,
    pub final_stage: Stage,
    pub paired: PairedConfig,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            policy: ClassifierPolicy::default(),
            baseline: Stage::WithoutIr,
            final_stage: Stage::WithOverrides,
            paired: PairedConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub rule: &'static str,
    pub category: DriftCategory,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftSection {
    pub baseline: Stage,
    pub final_stage: Stage,
    pub total_issues: usize,
    pub stages: Vec<StageDriftRow>,
    pub rule_hits: Vec<RuleHit>,
    pub error_reduction: Outcome<PairedComparison>,
    pub total_drift: Outcome<PairedComparison>,
    pub error_reduction_rate: Option<f64>,
}

pub fn classify_dataset(dataset: &DriftDataset, policy: &ClassifierPolicy) -> Vec<ClassifiedIssue> {
    dataset
        .issues
        .iter()
        .map(|staged| {
            let (category, rule) = classify_with_rule(&staged.issue, policy);
            debug!(
                stage = %staged.stage,
                app = %staged.app,
                filed = %staged.filed_severity,
                category = %category,
                rule,
                "classified issue"
            );
            ClassifiedIssue {
                stage: staged.stage,
                app: staged.app.clone(),
                filed_severity: staged.filed_severity.clone(),
                category,
                rule,
            }
        })
        .collect()
}

pub fn analyze_drift(dataset: &DriftDataset, config: &DriftConfig) -> DriftSection {
    let classified = classify_dataset(dataset, &config.policy);
    let stages = aggregate(dataset, &classified);

    for row in &stages {
        info!(
            stage = %row.stage,
            apps = row.apps_with_records,
            error = row.counts.error,
            enhancement = row.counts.enhancement,
            noise = row.counts.noise,
            "drift counts"
        );
    }

    let error_reduction = stage_test(
        dataset,
        &classified,
        config,
        Some(DriftCategory::Error),
        Hypothesis::Decrease,
    );
    let total_drift = stage_test(dataset, &classified, config, None, Hypothesis::TwoSided);

    let row = |stage: Stage| stages.iter().find(|row| row.stage == stage);
    let error_reduction_rate = match (row(config.baseline), row(config.final_stage)) {
        (Some(baseline), Some(final_row)) => error_reduction_rate(baseline, final_row),
        _ => None,
    };
    match error_reduction_rate {
        Some(rate) => info!(
            baseline = %config.baseline,
            final_stage = %config.final_stage,
            rate = %format!("{rate:.1}%"),
            "normalized error reduction"
        ),
        None => info!(
            baseline = %config.baseline,
            "error reduction rate undefined (no baseline errors or stage missing)"
        ),
    }

    DriftSection {
        baseline: config.baseline,
        final_stage: config.final_stage,
        total_issues: classified.len(),
        stages,
        rule_hits: rule_hits(&classified),
        error_reduction,
        total_drift,
        error_reduction_rate,
    }
}

fn stage_test(
    dataset: &DriftDataset,
    classified: &[ClassifiedIssue],
    config: &DriftConfig,
    category: Option<DriftCategory>,
    hypothesis: Hypothesis,
) -> Outcome<PairedComparison> {
    for stage in [config.baseline, config.final_stage] {
        if !dataset.apps_by_stage.contains_key(&stage) {
            warn!(stage = %stage, "drift comparison stage missing from input");
            return Outcome::MissingStage { stage };
        }
    }

    let baseline = per_app_counts(dataset, classified, config.baseline, category);
    let final_counts = per_app_counts(dataset, classified, config.final_stage, category);
    let paired = PairedConfig {
        hypothesis,
        ..config.paired
    };
    let outcome = compare_paired(&baseline, &final_counts, &paired);

    let measure = category.map_or("total", DriftCategory::as_str);
    match &outcome {
        Outcome::Computed(result) => info!(
            measure,
            n_pairs = result.n_pairs,
            statistic = result.statistic,
            p_value = result.p_value,
            significant = result.significant,
            "drift comparison"
        ),
        other => warn!(
            measure,
            reason = %other.skip_reason().unwrap_or_default(),
            "drift comparison skipped"
        ),
    }
    outcome
}

fn rule_hits(classified: &[ClassifiedIssue]) -> Vec<RuleHit> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for issue in classified {
        *counts.entry(issue.rule).or_default() += 1;
    }

    RULES
        .iter()
        .map(|rule| (rule.name, rule.category))
        .chain([(FALLBACK_RULE, DriftCategory::Noise)])
        .map(|(rule, category)| RuleHit {
            rule,
            category,
            count: counts.get(rule).copied().unwrap_or(0),
        })
        .collect()
}
