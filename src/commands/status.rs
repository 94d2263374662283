use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::extract::{extract_app_records, extract_drift_dataset};
use crate::stage::{Stage, present_in_order};
use crate::util::{read_json_value, sha256_file};

#[derive(Debug, Default, PartialEq, Eq)]
struct StatusSummary {
    apps_per_stage: Option<BTreeMap<Stage, usize>>,
    issues_per_stage: Option<BTreeMap<Stage, usize>>,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let summary = summarize(&args)?;
    info!(
        metrics_stages = summary.apps_per_stage.as_ref().map_or(0, BTreeMap::len),
        diff_stages = summary.issues_per_stage.as_ref().map_or(0, BTreeMap::len),
        "status complete"
    );
    Ok(())
}

fn summarize(args: &StatusArgs) -> Result<StatusSummary> {
    info!(metrics = %args.metrics_json.display(), "status requested");
    let mut summary = StatusSummary::default();

    if args.metrics_json.exists() {
        summary.apps_per_stage = Some(metrics_status(&args.metrics_json)?);
    } else {
        warn!(path = %args.metrics_json.display(), "metrics input missing");
    }

    match &args.diff_json {
        Some(path) if path.exists() => summary.issues_per_stage = Some(diff_status(path)?),
        Some(path) => warn!(path = %path.display(), "diff input missing"),
        None => info!("no diff input given"),
    }

    Ok(summary)
}

fn metrics_status(path: &Path) -> Result<BTreeMap<Stage, usize>> {
    let metrics = read_json_value(path)?;
    let records = extract_app_records(&metrics);

    info!(
        path = %path.display(),
        sha256 = %sha256_file(path)?,
        records = records.len(),
        "loaded metrics input"
    );

    let mut apps_per_stage: BTreeMap<Stage, usize> = BTreeMap::new();
    let mut effort_sources: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *apps_per_stage.entry(record.stage).or_default() += 1;
        if let Some(source) = record.effort_source {
            *effort_sources.entry(source).or_default() += 1;
        }
    }

    for stage in present_in_order(apps_per_stage.keys().copied()) {
        let apps = apps_per_stage.get(&stage).copied().unwrap_or_default();
        let successful = records
            .iter()
            .filter(|record| record.stage == stage && record.fully_successful())
            .count();
        info!(
            stage = %stage,
            label = stage.label(),
            apps,
            fully_successful = successful,
            "stage present"
        );
    }
    for (source, count) in &effort_sources {
        info!(source, count, "human-effort key");
    }
    Ok(apps_per_stage)
}

fn diff_status(path: &Path) -> Result<BTreeMap<Stage, usize>> {
    let diff = read_json_value(path)?;
    let dataset = extract_drift_dataset(&diff);

    info!(
        path = %path.display(),
        sha256 = %sha256_file(path)?,
        stages = dataset.apps_by_stage.len(),
        issues = dataset.issues.len(),
        "loaded diff input"
    );

    let mut issues_per_stage = BTreeMap::new();
    for (stage, apps) in &dataset.apps_by_stage {
        let issues = dataset
            .issues
            .iter()
            .filter(|issue| issue.stage == *stage)
            .count();
        info!(stage = %stage, apps = apps.len(), issues, "drift stage present");
        issues_per_stage.insert(*stage, issues);
    }
    Ok(issues_per_stage)
}
