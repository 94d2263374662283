use serde::Serialize;

use crate::model::{DiscrepancyIssue, DriftCategory, Severity};

const ENHANCEMENT_MARKERS: [&str; 2] = ["enhancement", "production ready"];
const HEALTH_CHECK_MARKERS: [&str; 2] = ["readinessprobe", "livenessprobe"];
const BENIGN_MARKERS: [&str; 3] = ["correctly mapped", "local image", "different name"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassifierPolicy {
    pub unknown_severity_is_error: bool,
}

#[derive(Debug, Clone)]
pub struct IssueView {
    pub severity: Severity,
    pub comments: String,
    pub description: String,
    pub issue_type: String,
    pub path: String,
}

impl IssueView {
    pub fn new(issue: &DiscrepancyIssue) -> Self {
        let lowered = |field: &Option<String>| field.as_deref().unwrap_or_default().to_lowercase();
        Self {
            severity: issue.effective_severity(),
            comments: lowered(&issue.comments),
            description: lowered(&issue.severity_description),
            issue_type: lowered(&issue.issue_type),
            path: lowered(&issue.path),
        }
    }

    fn is_addition(&self) -> bool {
        self.issue_type.contains("extra")
    }

    fn is_blocking(&self, policy: &ClassifierPolicy) -> bool {
        self.severity.is_blocking()
            || (policy.unknown_severity_is_error && self.severity == Severity::Unknown)
    }
}

pub struct DriftRule {
    pub name: &'static str,
    pub category: DriftCategory,
    matches: fn(&IssueView, &ClassifierPolicy) -> bool,
}

impl DriftRule {
    pub fn matches(&self, view: &IssueView, policy: &ClassifierPolicy) -> bool {
        (self.matches)(view, policy)
    }
}

pub const FALLBACK_RULE: &str = "default_noise";

pub const RULES: [DriftRule; 5] = [
    DriftRule {
        name: "enhancement_comment",
        category: DriftCategory::Enhancement,
        matches: |view, _| {
            ENHANCEMENT_MARKERS
                .iter()
                .any(|marker| view.comments.contains(marker))
        },
    },
    DriftRule {
        name: "security_addition",
        category: DriftCategory::Enhancement,
        matches: |view, _| view.description.contains("security") && view.is_addition(),
    },
    DriftRule {
        name: "health_check_addition",
        category: DriftCategory::Enhancement,
        matches: |view, _| {
            HEALTH_CHECK_MARKERS.iter().any(|marker| view.path.contains(marker)) && view.is_addition()
        },
    },
    DriftRule {
        name: "benign_blocking",
        category: DriftCategory::Noise,
        matches: |view, policy| {
            view.is_blocking(policy)
                && BENIGN_MARKERS
                    .iter()
                    .any(|marker| view.comments.contains(marker))
        },
    },
    DriftRule {
        name: "blocking_severity",
        category: DriftCategory::Error,
        matches: |view, policy| view.is_blocking(policy),
    },
];

pub fn classify_with_rule(
    issue: &DiscrepancyIssue,
    policy: &ClassifierPolicy,
) -> (DriftCategory, &'static str) {
    let view = IssueView::new(issue);
    RULES
        .iter()
        .find(|rule| rule.matches(&view, policy))
        .map(|rule| (rule.category, rule.name))
        .unwrap_or((DriftCategory::Noise, FALLBACK_RULE))
}
