use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::DriftArgs;
use crate::commands::{REPORT_VERSION, fingerprint_input};
use crate::config::AnalysisConfig;
use crate::drift::analyze_drift;
use crate::extract::extract_drift_dataset;
use crate::model::InputFile;
use crate::util::{now_utc_string, read_json_value, utc_compact_string, write_json_pretty};

use super::*;

pub fn run(args: DriftArgs) -> Result<()> {
    let run_id = format!("drift-{}", utc_compact_string(Utc::now()));
    let config = AnalysisConfig::from_options(&args.options)?;

    info!(
        diff = %args.diff_json.display(),
        run_id = %run_id,
        baseline = %config.drift_baseline,
        final_stage = %config.drift_final,
        "starting drift classification"
    );

    if !args.diff_json.exists() {
        warn!(path = %args.diff_json.display(), "diff input not found; nothing to classify");
        return Ok(());
    }
    let inputs = vec![fingerprint_input("diff", &args.diff_json)?];
    let diff = read_json_value(&args.diff_json)?;

    let report = build_report(&diff, &config, inputs, run_id);
    write_json_pretty(&args.report_path, &report)?;

    info!(
        path = %args.report_path.display(),
        issues = report.drift.total_issues,
        errors_reduced = report
            .drift
            .error_reduction
            .computed()
            .is_some_and(|result| result.significant),
        "wrote drift report"
    );
    Ok(())
}

pub(super) fn build_report(
    diff: &Value,
    config: &AnalysisConfig,
    inputs: Vec<InputFile>,
    run_id: String,
) -> DriftReport {
    let dataset = extract_drift_dataset(diff);
    if dataset.apps_by_stage.is_empty() {
        warn!("diff input holds no applications under a known stage");
    }

    let applications: usize = dataset.apps_by_stage.values().map(|apps| apps.len()).sum();
    info!(
        stages = dataset.apps_by_stage.len(),
        applications,
        issues = dataset.issues.len(),
        "extracted drift dataset"
    );

    DriftReport {
        report_version: REPORT_VERSION.to_string(),
        run_id,
        generated_at: now_utc_string(),
        inputs,
        applications,
        config: config.clone(),
        drift: analyze_drift(&dataset, &config.drift()),
    }
}
