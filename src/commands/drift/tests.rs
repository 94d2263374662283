use std::fs;

use clap::Parser;
use serde_json::{Value, json};

use super::*;
use crate::cli::{Cli, Commands, DriftArgs};
use crate::compare::Outcome;
use crate::config::AnalysisConfig;
use crate::stage::Stage;

fn high_issues(count: usize) -> Value {
    let issues: Vec<Value> = (0..count)
        .map(|index| json!({"severity_level": "HIGH", "path": format!("spec.replicas[{index}]")}))
        .collect();
    json!({"issues_by_severity": {"HIGH": issues}})
}

fn diff_fixture() -> Value {
    json!({
        "without_ir": {
            "a": high_issues(3),
            "b": high_issues(2),
            "c": high_issues(4),
            "d": high_issues(1),
            "e": high_issues(2)
        },
        "with_overrides": {
            "a": {"issues_by_severity": {"UNKNOWN": [{"severity_level": "WEIRD"}]}},
            "b": {"issues_by_severity": {}},
            "c": {"issues_by_severity": {}},
            "d": {},
            "e": {"issues_by_severity": {}}
        }
    })
}

fn drift_args(argv: &[&str]) -> DriftArgs {
    match Cli::try_parse_from(argv).expect("parse").command {
        Commands::Drift(args) => args,
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn baseline_errors_vanish_by_final_stage() {
    let report = run::build_report(
        &diff_fixture(),
        &AnalysisConfig::default(),
        Vec::new(),
        "drift-test".to_string(),
    );

    assert_eq!(report.applications, 10);
    assert_eq!(report.drift.total_issues, 13);
    assert_eq!(report.drift.baseline, Stage::WithoutIr);
    assert_eq!(report.drift.final_stage, Stage::WithOverrides);

    let reduction = report.drift.error_reduction.computed().expect("computed");
    assert_eq!(reduction.n_pairs, 5);
    assert_eq!(reduction.decreased, 5);
    assert!(reduction.significant);
    assert_eq!(report.drift.error_reduction_rate, Some(100.0));

    let final_row = report
        .drift
        .stages
        .iter()
        .find(|row| row.stage == Stage::WithOverrides)
        .expect("final row");
    assert_eq!(final_row.counts.noise, 1);
    assert_eq!(final_row.counts.error, 0);
}

#[test]
fn unknown_severity_policy_flows_from_options() {
    let config = AnalysisConfig {
        unknown_severity_is_error: true,
        ..AnalysisConfig::default()
    };
    let report = run::build_report(&diff_fixture(), &config, Vec::new(), "drift-test".to_string());
    let final_row = report
        .drift
        .stages
        .iter()
        .find(|row| row.stage == Stage::WithOverrides)
        .expect("final row");
    assert_eq!(final_row.counts.error, 1);
    assert!(report.drift.error_reduction_rate.is_some_and(|rate| rate < 100.0));
}

#[test]
fn diff_without_known_stages_reports_missing_stages() {
    let report = run::build_report(
        &json!({"prototype": {"a": {}}}),
        &AnalysisConfig::default(),
        Vec::new(),
        "drift-test".to_string(),
    );
    assert_eq!(report.applications, 0);
    assert!(report.drift.stages.is_empty());
    assert_eq!(
        report.drift.error_reduction,
        Outcome::MissingStage {
            stage: Stage::WithoutIr
        }
    );
}

#[test]
fn run_writes_drift_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diff_path = dir.path().join("diff.json");
    fs::write(&diff_path, diff_fixture().to_string()).expect("write diff");
    let report_path = dir.path().join("drift.json");

    let args = drift_args(&[
        "manifest-drift",
        "drift",
        diff_path.to_str().expect("utf-8"),
        "--report-path",
        report_path.to_str().expect("utf-8"),
        "--drift-final",
        "with_overrides",
    ]);
    run(args).expect("drift run");

    let written: Value =
        serde_json::from_slice(&fs::read(&report_path).expect("read report")).expect("json");
    assert_eq!(written["inputs"][0]["role"], json!("diff"));
    assert_eq!(written["drift"]["error_reduction"]["status"], json!("computed"));
    assert_eq!(written["drift"]["total_issues"], json!(13));
}

#[test]
fn run_skips_missing_diff_and_rejects_equal_stages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.json");
    let report_path = dir.path().join("drift.json");
    let args = drift_args(&[
        "manifest-drift",
        "drift",
        missing.to_str().expect("utf-8"),
        "--report-path",
        report_path.to_str().expect("utf-8"),
    ]);
    run(args).expect("missing diff is a skip");
    assert!(!report_path.exists());

    let diff_path = dir.path().join("diff.json");
    fs::write(&diff_path, diff_fixture().to_string()).expect("write diff");
    let args = drift_args(&[
        "manifest-drift",
        "drift",
        diff_path.to_str().expect("utf-8"),
        "--drift-baseline",
        "with_ir",
        "--drift-final",
        "with_ir",
    ]);
    assert!(run(args).is_err());
}
