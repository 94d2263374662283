use tracing::{info, warn};

use crate::agreement::{StageAgreement, evaluate_by_stage};
use crate::model::AlignmentRecord;

fn fmt_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.3}"))
}

pub fn analyze_alignment(records: &[AlignmentRecord]) -> Vec<StageAgreement> {
    if records.is_empty() {
        warn!("no applications carry both a static and a runtime judgment");
        return Vec::new();
    }

    let rows = evaluate_by_stage(records);
    for row in &rows {
        let metrics = &row.metrics;
        info!(
            stage = %row.stage,
            n = metrics.n,
            agreement_pct = %fmt_metric(metrics.agreement_pct),
            kappa = %fmt_metric(metrics.cohen_kappa),
            mcc = %fmt_metric(metrics.matthews),
            f1 = %fmt_metric(metrics.f1),
            static_positive_pct = %fmt_metric(metrics.static_positive_pct),
            runtime_positive_pct = %fmt_metric(metrics.runtime_positive_pct),
            "static vs runtime agreement"
        );
    }
    rows
}
