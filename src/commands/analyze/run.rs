use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cli::AnalyzeArgs;
use crate::commands::{REPORT_VERSION, fingerprint_input};
use crate::config::AnalysisConfig;
use crate::drift::analyze_drift;
use crate::extract::{extract_alignment, extract_app_records, extract_drift_dataset};
use crate::model::InputFile;
use crate::stage::present_in_order;
use crate::util::{now_utc_string, read_json_value, utc_compact_string, write_json_pretty};

use super::*;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let config = AnalysisConfig::from_options(&args.options)?;

    info!(
        metrics = %args.metrics_json.display(),
        run_id = %run_id,
        "starting analysis"
    );

    let mut inputs = Vec::new();
    let metrics = load_input("metrics", &args.metrics_json, &mut inputs)?;
    if metrics.is_none() {
        warn!(
            path = %args.metrics_json.display(),
            "metrics input not found; skipping outcome, effort, security and alignment sections"
        );
    }

    let diff = match &args.diff_json {
        Some(path) => {
            let diff = load_input("diff", path, &mut inputs)?;
            if diff.is_none() {
                warn!(path = %path.display(), "diff input not found; skipping drift analysis");
            }
            diff
        }
        None => {
            info!("no diff input given; skipping drift analysis");
            None
        }
    };

    let repositories = match &args.repo_csv {
        Some(path) if path.exists() => {
            inputs.push(fingerprint_input("repo_csv", path)?);
            Some(load_repositories(path)?)
        }
        Some(path) => {
            warn!(path = %path.display(), "repository metadata not found; skipping");
            None
        }
        None => {
            info!("no repository metadata given; skipping metadata summary");
            None
        }
    };

    if metrics.is_none() && diff.is_none() && repositories.is_none() {
        warn!("no input available; nothing to analyze");
        return Ok(());
    }

    let report = build_report(
        metrics.as_ref(),
        diff.as_ref(),
        repositories.as_deref(),
        &config,
        inputs,
        run_id,
    );
    write_json_pretty(&args.report_path, &report)?;

    info!(
        path = %args.report_path.display(),
        stages = report.stages.len(),
        applications = report.applications,
        "wrote analysis report"
    );
    Ok(())
}

fn load_input(
    role: &'static str,
    path: &Path,
    inputs: &mut Vec<InputFile>,
) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    inputs.push(fingerprint_input(role, path)?);
    read_json_value(path).map(Some)
}

pub(super) fn build_report(
    metrics: Option<&Value>,
    diff: Option<&Value>,
    repositories: Option<&[RepositoryRow]>,
    config: &AnalysisConfig,
    inputs: Vec<InputFile>,
    run_id: String,
) -> AnalysisReport {
    let records = metrics.map(extract_app_records).unwrap_or_default();
    if metrics.is_some() && records.is_empty() {
        warn!("metrics input holds no application records under a known stage");
    }

    let stages = present_in_order(records.iter().map(|record| record.stage));
    let applications = records
        .iter()
        .map(|record| record.app.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    info!(
        stages = stages.len(),
        records = records.len(),
        applications,
        "extracted application records"
    );

    let mut effort_sources: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *effort_sources
            .entry(record.effort_source.unwrap_or("none"))
            .or_default() += 1;
    }
    for (source, count) in &effort_sources {
        debug!(source, count, "human-effort key usage");
    }

    let sections = ReportSections {
        metadata: repositories.and_then(analyze_metadata),
        outcomes: metrics.map(|_| analyze_outcomes(&records, config)),
        effort: metrics.map(|_| analyze_effort(&records, config)),
        security: metrics.map(|_| analyze_security(&records, config)),
        alignment: metrics.map(|metrics| analyze_alignment(&extract_alignment(metrics))),
        drift: diff.map(|diff| analyze_drift(&extract_drift_dataset(diff), &config.drift())),
    };

    AnalysisReport {
        report_version: REPORT_VERSION.to_string(),
        run_id,
        generated_at: now_utc_string(),
        inputs,
        stages,
        applications,
        config: config.clone(),
        sections,
    }
}
