use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{DriftCategory, DriftDataset};
use crate::stage::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedIssue {
    pub stage: Stage,
    pub app: String,
    pub filed_severity: String,
    pub category: DriftCategory,
    pub rule: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub error: usize,
    pub enhancement: usize,
    pub noise: usize,
}

impl CategoryCounts {
    pub fn add(&mut self, category: DriftCategory) {
        match category {
            DriftCategory::Error => self.error += 1,
            DriftCategory::Enhancement => self.enhancement += 1,
            DriftCategory::Noise => self.noise += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.error + self.enhancement + self.noise
    }

    pub fn per_app(&self, apps: usize) -> Option<NormalizedCounts> {
        if apps == 0 {
            return None;
        }
        let apps = apps as f64;
        Some(NormalizedCounts {
            error: self.error as f64 / apps,
            enhancement: self.enhancement as f64 / apps,
            noise: self.noise as f64 / apps,
            total: self.total() as f64 / apps,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedCounts {
    pub error: f64,
    pub enhancement: f64,
    pub noise: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDriftRow {
    pub stage: Stage,
    pub label: &'static str,
    pub apps_with_records: usize,
    pub counts: CategoryCounts,
    pub per_app: Option<NormalizedCounts>,
}

pub fn aggregate(dataset: &DriftDataset, classified: &[ClassifiedIssue]) -> Vec<StageDriftRow> {
    let mut counts: BTreeMap<Stage, CategoryCounts> = BTreeMap::new();
    let mut contributors: BTreeMap<Stage, BTreeSet<&str>> = BTreeMap::new();
    for issue in classified {
        counts.entry(issue.stage).or_default().add(issue.category);
        contributors
            .entry(issue.stage)
            .or_default()
            .insert(issue.app.as_str());
    }

    let stages: BTreeSet<Stage> = dataset.stages().chain(counts.keys().copied()).collect();
    stages
        .into_iter()
        .map(|stage| {
            let counts = counts.get(&stage).copied().unwrap_or_default();
            let apps_with_records = contributors.get(&stage).map_or(0, BTreeSet::len);
            StageDriftRow {
                stage,
                label: stage.label(),
                apps_with_records,
                counts,
                per_app: counts.per_app(apps_with_records),
            }
        })
        .collect()
}

pub fn per_app_counts(
    dataset: &DriftDataset,
    classified: &[ClassifiedIssue],
    stage: Stage,
    category: Option<DriftCategory>,
) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, f64> = dataset
        .apps_by_stage
        .get(&stage)
        .into_iter()
        .flatten()
        .map(|app| (app.clone(), 0.0))
        .collect();

    for issue in classified {
        if issue.stage != stage || category.is_some_and(|wanted| wanted != issue.category) {
            continue;
        }
        *counts.entry(issue.app.clone()).or_insert(0.0) += 1.0;
    }
    counts
}

pub fn error_reduction_rate(baseline: &StageDriftRow, final_row: &StageDriftRow) -> Option<f64> {
    let base = baseline.per_app?.error;
    let last = final_row.per_app?.error;
    (base > 0.0).then(|| (base - last) / base * 100.0)
}
