use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{AlignmentRecord, AppRecord, DiscrepancyIssue, DriftDataset, StagedIssue};
use crate::stage::Stage;
use crate::util::lookup;

pub const EFFORT_KEYS: [&str; 4] = [
    "human_effort_ir",
    "human_effort_overrides",
    "human_effort",
    "human-effort",
];

pub fn extract_app_records(root: &Value) -> Vec<AppRecord> {
    let mut records = Vec::new();
    for (stage, app, bag) in stage_apps(root) {
        records.push(extract_app_record(stage, app, bag));
    }
    records.sort_by(|a, b| a.stage.cmp(&b.stage).then_with(|| a.app.cmp(&b.app)));
    records
}

pub fn extract_app_record(stage: Stage, app: &str, bag: &Value) -> AppRecord {
    let mut record = AppRecord::defaults(stage, app);
    if !bag.is_object() {
        warn!(stage = %stage, app, "metrics bag is not an object; using defaults");
        return record;
    }

    let effort_hit = EFFORT_KEYS
        .iter()
        .find_map(|key| bag.get(*key).map(|value| (*key, value)));
    let empty = Value::Object(Map::new());
    let effort = match effort_hit {
        Some((key, value)) => {
            record.effort_source = Some(key);
            if value.is_object() || value.is_null() {
                value
            } else {
                debug!(stage = %stage, app, key, "human-effort record is not an object");
                &empty
            }
        }
        None => &empty,
    };

    record.manifests_renderable = flag(lookup(bag, &["skaffold", "manifests_renderable"]));
    record.deployment_successful = flag(lookup(bag, &["skaffold", "deployment_successful"]));
    record.pods_ready = flag(lookup(bag, &["skaffold", "pods_ready"]));
    record.services_accessible = flag(lookup(bag, &["skaffold", "services_accessible"]));
    record.llm_aligned_to_intent = flag(lookup(bag, &["llm_report", "aligned_to_intent"]));
    record.expected_entrypoint = flag(lookup(bag, &["manual_review", "expected_entrypoint"]));
    record.expected_behaviour = flag(lookup(bag, &["manual_review", "expected_behaviour"]));

    record.added_lines = count(lookup(effort, &["added_lines"]));
    record.removed_lines = count(lookup(effort, &["removed_lines"]));
    record.modified_lines = count(lookup(effort, &["modified_lines"]));
    record.total_operations = count(lookup(effort, &["total_operations"]));

    record.kubescape_critical = count(lookup(bag, &["kubescape", "critical"]));
    record.kubescape_high = count(lookup(bag, &["kubescape", "high"]));
    record.kubescape_medium = count(lookup(bag, &["kubescape", "medium"]));
    record.kubescape_low = count(lookup(bag, &["kubescape", "low"]));
    record.kubescape_total_controls = count(lookup(bag, &["kubescape", "total_controls"]));
    record.cluster_lines = count(lookup(bag, &["cluster_lines"]));

    record
}

pub fn extract_alignment(root: &Value) -> Vec<AlignmentRecord> {
    let mut records = Vec::new();
    for (stage, app, bag) in stage_apps(root) {
        let static_value = lookup(bag, &["llm_report", "aligned_to_intent"]).filter(|v| !v.is_null());
        let runtime_value =
            lookup(bag, &["manual_review", "expected_behaviour"]).filter(|v| !v.is_null());
        let (Some(static_value), Some(runtime_value)) = (static_value, runtime_value) else {
            continue;
        };
        records.push(AlignmentRecord {
            stage,
            app: app.to_string(),
            static_aligned: flag(Some(static_value)),
            runtime_expected: flag(Some(runtime_value)),
        });
    }
    records.sort_by(|a, b| a.stage.cmp(&b.stage).then_with(|| a.app.cmp(&b.app)));
    records
}

pub fn extract_drift_dataset(root: &Value) -> DriftDataset {
    let mut dataset = DriftDataset::default();
    for (stage, app, bag) in stage_apps(root) {
        dataset
            .apps_by_stage
            .entry(stage)
            .or_default()
            .insert(app.to_string());

        let Some(buckets) = lookup(bag, &["issues_by_severity"]) else {
            continue;
        };
        let Some(buckets) = buckets.as_object() else {
            debug!(stage = %stage, app, "issues_by_severity is not an object");
            continue;
        };
        for (filed_severity, issues) in buckets {
            let Some(issues) = issues.as_array() else {
                debug!(stage = %stage, app, severity = %filed_severity, "issue bucket is not a list");
                continue;
            };
            for issue in issues {
                if !issue.is_object() {
                    debug!(stage = %stage, app, "skipping non-object issue");
                    continue;
                }
                dataset.issues.push(StagedIssue {
                    stage,
                    app: app.to_string(),
                    filed_severity: filed_severity.clone(),
                    issue: DiscrepancyIssue::from_value(issue),
                });
            }
        }
    }
    dataset
}

pub fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(raw)) => raw.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub fn count(value: Option<&Value>) -> u64 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n.trunc() as u64))
            .unwrap_or_else(|| {
                debug!(value = %number, "negative count treated as zero");
                0
            }),
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            trimmed
                .parse::<u64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|n| n.is_finite() && *n >= 0.0)
                        .map(|n| n.trunc() as u64)
                })
                .unwrap_or_else(|| {
                    debug!(value = %raw, "non-numeric count treated as zero");
                    0
                })
        }
        Some(Value::Object(map)) => match map.get("total") {
            Some(Value::Object(_)) | None => 0,
            total => count(total),
        },
        Some(other) => {
            debug!(value = %other, "unsupported count shape treated as zero");
            0
        }
    }
}

fn stage_apps(root: &Value) -> Vec<(Stage, &str, &Value)> {
    let Some(stages) = root.as_object() else {
        warn!("results root is not an object; nothing to extract");
        return Vec::new();
    };

    let mut rows = Vec::new();
    for (stage_key, apps) in stages {
        let Some(stage) = Stage::from_key(stage_key) else {
            warn!(stage = %stage_key, "skipping unknown stage");
            continue;
        };
        let Some(apps) = apps.as_object() else {
            warn!(stage = %stage, "stage entry is not an object; skipping");
            continue;
        };
        for (app, bag) in apps {
            rows.push((stage, app.as_str(), bag));
        }
    }
    rows
}
