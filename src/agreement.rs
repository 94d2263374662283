use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::AlignmentRecord;
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

impl ConfusionCounts {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut counts = Self::default();
        for (predicted, actual) in pairs {
            match (predicted, actual) {
                (true, true) => counts.true_positive += 1,
                (true, false) => counts.false_positive += 1,
                (false, true) => counts.false_negative += 1,
                (false, false) => counts.true_negative += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }

    pub fn predicted_positive(&self) -> usize {
        self.true_positive + self.false_positive
    }

    pub fn actual_positive(&self) -> usize {
        self.true_positive + self.false_negative
    }
}

/// Rates are percentages. Every ratio whose denominator is zero is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementMetrics {
    pub n: usize,
    pub agreement: usize,
    pub agreement_pct: Option<f64>,
    pub cohen_kappa: Option<f64>,
    pub matthews: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub static_positive_pct: Option<f64>,
    pub runtime_positive_pct: Option<f64>,
    pub confusion: ConfusionCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageAgreement {
    pub stage: Stage,
    pub label: &'static str,
    #[serde(flatten)]
    pub metrics: AgreementMetrics,
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

pub fn evaluate<I>(pairs: I) -> AgreementMetrics
where
    I: IntoIterator<Item = (bool, bool)>,
{
    let confusion = ConfusionCounts::from_pairs(pairs);
    let n = confusion.total();
    let total = n as f64;
    let tp = confusion.true_positive as f64;
    let fp = confusion.false_positive as f64;
    let fn_ = confusion.false_negative as f64;
    let tn = confusion.true_negative as f64;

    let agreement = confusion.true_positive + confusion.true_negative;
    let observed = ratio(agreement as f64, total);
    let static_rate = ratio(confusion.predicted_positive() as f64, total);
    let runtime_rate = ratio(confusion.actual_positive() as f64, total);

    let cohen_kappa = match (observed, static_rate, runtime_rate) {
        (Some(observed), Some(p_static), Some(p_runtime)) => {
            let expected = p_static * p_runtime + (1.0 - p_static) * (1.0 - p_runtime);
            ratio(observed - expected, 1.0 - expected)
        }
        _ => None,
    };

    let mcc_denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    let matthews = ratio(tp * tn - fp * fn_, mcc_denominator);

    AgreementMetrics {
        n,
        agreement,
        agreement_pct: observed.map(|rate| rate * 100.0),
        cohen_kappa,
        matthews,
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
        f1: ratio(2.0 * tp, 2.0 * tp + fp + fn_),
        static_positive_pct: static_rate.map(|rate| rate * 100.0),
        runtime_positive_pct: runtime_rate.map(|rate| rate * 100.0),
        confusion,
    }
}

pub fn evaluate_by_stage(records: &[AlignmentRecord]) -> Vec<StageAgreement> {
    let mut grouped: BTreeMap<Stage, Vec<(bool, bool)>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.stage)
            .or_default()
            .push((record.static_aligned, record.runtime_expected));
    }

    grouped
        .into_iter()
        .map(|(stage, pairs)| StageAgreement {
            stage,
            label: stage.label(),
            metrics: evaluate(pairs),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|value| (value - expected).abs() < 1e-9)
    }

    #[test]
    fn mixed_judgments_produce_every_metric() {
        let mut pairs = vec![(true, true); 3];
        pairs.extend([(true, false); 2]);
        pairs.push((false, true));
        pairs.extend([(false, false); 4]);

        let metrics = evaluate(pairs);
        assert_eq!(metrics.n, 10);
        assert_eq!(metrics.agreement, 7);
        assert!(close(metrics.agreement_pct, 70.0));
        assert!(close(metrics.precision, 0.6));
        assert!(close(metrics.recall, 0.75));
        assert!(close(metrics.f1, 6.0 / 9.0));
        assert!(close(metrics.cohen_kappa, 0.4));
        assert!(close(metrics.matthews, 10.0 / 600.0_f64.sqrt()));
        assert!(close(metrics.static_positive_pct, 50.0));
        assert!(close(metrics.runtime_positive_pct, 40.0));
    }

    #[test]
    fn constant_raters_leave_correlations_undefined() {
        let metrics = evaluate(vec![(true, true); 5]);
        assert!(close(metrics.agreement_pct, 100.0));
        assert_eq!(metrics.cohen_kappa, None);
        assert_eq!(metrics.matthews, None);
        assert!(close(metrics.precision, 1.0));

        let never_positive = evaluate(vec![(false, false), (false, true)]);
        assert_eq!(never_positive.precision, None);
        assert!(close(never_positive.recall, 0.0));
        assert!(close(never_positive.f1, 0.0));
    }

    #[test]
    fn empty_input_is_all_undefined() {
        let metrics = evaluate(Vec::new());
        assert_eq!(metrics.n, 0);
        assert_eq!(metrics.agreement_pct, None);
        assert_eq!(metrics.cohen_kappa, None);
        assert_eq!(metrics.f1, None);
        assert_eq!(metrics.static_positive_pct, None);
    }

    #[test]
    fn stages_are_grouped_in_canonical_order() {
        let record = |stage, app: &str, static_aligned, runtime_expected| AlignmentRecord {
            stage,
            app: app.to_string(),
            static_aligned,
            runtime_expected,
        };
        let rows = evaluate_by_stage(&[
            record(Stage::WithOverrides, "a", true, false),
            record(Stage::WithoutIr, "a", true, true),
            record(Stage::WithoutIr, "b", false, true),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stage, Stage::WithoutIr);
        assert_eq!(rows[0].metrics.n, 2);
        assert_eq!(rows[1].label, "IR With Overrides");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_kappa_and_agreement_are_symmetric(
            pairs in prop::collection::vec(any::<(bool, bool)>(), 0..40),
        ) {
            let forward = evaluate(pairs.iter().copied());
            let swapped = evaluate(pairs.iter().map(|(a, b)| (*b, *a)));
            prop_assert_eq!(forward.agreement, swapped.agreement);
            prop_assert_eq!(forward.agreement_pct, swapped.agreement_pct);
            prop_assert_eq!(forward.cohen_kappa, swapped.cohen_kappa);
            prop_assert_eq!(forward.matthews, swapped.matthews);
        }

        #[test]
        fn prop_kappa_stays_in_range(
            pairs in prop::collection::vec(any::<(bool, bool)>(), 1..40),
        ) {
            if let Some(kappa) = evaluate(pairs).cohen_kappa {
                prop_assert!((-1.0 - 1e-12..=1.0 + 1e-12).contains(&kappa));
            }
        }
    }
}
