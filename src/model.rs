use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::stage::Stage;
use crate::util::lookup;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppRecord {
    pub stage: Stage,
    pub app: String,
    pub manifests_renderable: bool,
    pub deployment_successful: bool,
    pub pods_ready: bool,
    pub services_accessible: bool,
    pub llm_aligned_to_intent: bool,
    pub expected_entrypoint: bool,
    pub expected_behaviour: bool,
    pub added_lines: u64,
    pub removed_lines: u64,
    pub modified_lines: u64,
    pub total_operations: u64,
    pub kubescape_critical: u64,
    pub kubescape_high: u64,
    pub kubescape_medium: u64,
    pub kubescape_low: u64,
    pub kubescape_total_controls: u64,
    pub cluster_lines: u64,
    pub effort_source: Option<&'static str>,
}

impl AppRecord {
    pub fn defaults(stage: Stage, app: &str) -> Self {
        Self {
            stage,
            app: app.to_string(),
            manifests_renderable: false,
            deployment_successful: false,
            pods_ready: false,
            services_accessible: false,
            llm_aligned_to_intent: false,
            expected_entrypoint: false,
            expected_behaviour: false,
            added_lines: 0,
            removed_lines: 0,
            modified_lines: 0,
            total_operations: 0,
            kubescape_critical: 0,
            kubescape_high: 0,
            kubescape_medium: 0,
            kubescape_low: 0,
            kubescape_total_controls: 0,
            cluster_lines: 0,
            effort_source: None,
        }
    }

    pub fn fully_successful(&self) -> bool {
        self.manifests_renderable
            && self.deployment_successful
            && self.pods_ready
            && self.services_accessible
    }

    pub fn kubescape_failed(&self) -> u64 {
        self.kubescape_critical + self.kubescape_high + self.kubescape_medium + self.kubescape_low
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub stage: Stage,
    pub app: String,
    pub static_aligned: bool,
    pub runtime_expected: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
    Unknown,
}

impl Severity {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Self::Critical,
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "LOW" => Self::Low,
            "INFO" => Self::Info,
            _ => Self::Unknown,
        }
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscrepancyIssue {
    pub severity_level: Option<String>,
    pub reviewed_level: Option<String>,
    pub comments: Option<String>,
    pub severity_description: Option<String>,
    pub issue_type: Option<String>,
    pub path: Option<String>,
}

impl DiscrepancyIssue {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| lookup(value, &[key]).and_then(Value::as_str).map(str::to_string);
        Self {
            severity_level: text("severity_level"),
            reviewed_level: text("reviewed_level"),
            comments: text("comments"),
            severity_description: text("severity_description"),
            issue_type: text("issue_type"),
            path: text("path"),
        }
    }

    /// Reviewed level wins whenever it is present and non-empty.
    pub fn effective_severity(&self) -> Severity {
        let non_empty = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|raw| !raw.is_empty())
                .map(Severity::parse)
        };
        non_empty(&self.reviewed_level)
            .or_else(|| non_empty(&self.severity_level))
            .unwrap_or(Severity::Unknown)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DriftCategory {
    Error,
    Enhancement,
    Noise,
}

impl DriftCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Enhancement => "Enhancement",
            Self::Noise => "Noise",
        }
    }
}

impl fmt::Display for DriftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedIssue {
    pub stage: Stage,
    pub app: String,
    pub filed_severity: String,
    pub issue: DiscrepancyIssue,
}

#[derive(Debug, Clone, Default)]
pub struct DriftDataset {
    pub apps_by_stage: BTreeMap<Stage, BTreeSet<String>>,
    pub issues: Vec<StagedIssue>,
}

impl DriftDataset {
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.apps_by_stage.keys().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputFile {
    pub role: &'static str,
    pub path: String,
    pub sha256: String,
}
