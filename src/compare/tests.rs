use super::paired::Direction;
use super::*;

fn by_app(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
    values
        .iter()
        .map(|(app, value)| (app.to_string(), *value))
        .collect()
}

fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance
}

#[test]
fn pairing_keeps_only_shared_apps() {
    let a = by_app(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
    let b = by_app(&[("b", 5.0), ("c", 6.0), ("d", 7.0)]);

    let pairs = align_by_key(&a, &b);
    assert_eq!(
        pairs,
        vec![("b".to_string(), 2.0, 5.0), ("c".to_string(), 3.0, 6.0)]
    );

    let outcome = compare_paired(&a, &b, &PairedConfig::default());
    assert_eq!(
        outcome,
        Outcome::InsufficientData {
            observed: 2,
            required: 3
        }
    );
}

#[test]
fn uniform_decrease_reports_full_effect() {
    let before = by_app(&[("x", 10.0), ("y", 20.0), ("z", 30.0)]);
    let after = by_app(&[("x", 5.0), ("y", 15.0), ("z", 25.0)]);

    let outcome = compare_paired(&before, &after, &PairedConfig::default());
    let result = outcome.computed().expect("computed");
    assert_eq!(result.n_pairs, 3);
    assert_eq!(result.median_delta, -5.0);
    assert_eq!(result.direction, Direction::Decrease);
    assert_eq!(result.effect_size, 1.0);
    assert_eq!(result.decreased, 3);
    assert_eq!(result.increased, 0);
    assert_eq!(result.method, TestMethod::NormalApproximation);
    assert!(close(result.p_value, 0.0833, 1e-3), "p = {}", result.p_value);
    assert!(!result.significant);
}

#[test]
fn distinct_differences_use_exact_distribution() {
    let before = by_app(&[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0), ("e", 50.0)]);
    let after = by_app(&[("a", 9.0), ("b", 18.0), ("c", 27.0), ("d", 36.0), ("e", 45.0)]);

    let two_sided = compare_paired(&before, &after, &PairedConfig::default());
    let result = two_sided.computed().expect("computed");
    assert_eq!(result.method, TestMethod::Exact);
    assert_eq!(result.statistic, 0.0);
    assert!(close(result.p_value, 2.0 / 32.0, 1e-12));

    let config = PairedConfig {
        hypothesis: Hypothesis::Decrease,
        ..PairedConfig::default()
    };
    let one_sided = compare_paired(&before, &after, &config);
    let result = one_sided.computed().expect("computed");
    assert_eq!(result.statistic, 15.0);
    assert!(close(result.p_value, 1.0 / 32.0, 1e-12));
    assert!(result.significant);

    let config = PairedConfig {
        hypothesis: Hypothesis::Increase,
        ..PairedConfig::default()
    };
    let wrong_way = compare_paired(&before, &after, &config);
    assert!(close(wrong_way.computed().expect("computed").p_value, 1.0, 1e-12));
}

#[test]
fn all_zero_differences_are_degenerate() {
    let a = by_app(&[("a", 4.0), ("b", 4.0), ("c", 9.0)]);
    let outcome = compare_paired(&a, &a, &PairedConfig::default());
    assert!(matches!(outcome, Outcome::Degenerate { .. }));
    assert!(outcome.skip_reason().is_some());
}

#[test]
fn pratt_keeps_zeros_in_the_ranking() {
    let before = by_app(&[("a", 5.0), ("b", 5.0), ("c", 8.0), ("d", 12.0), ("e", 20.0)]);
    let after = by_app(&[("a", 5.0), ("b", 3.0), ("c", 5.0), ("d", 8.0), ("e", 15.0)]);

    let excluded = compare_paired(&before, &after, &PairedConfig::default());
    let excluded = excluded.computed().expect("computed");
    assert_eq!(excluded.n_nonzero, 4);
    assert_eq!(excluded.unchanged, 1);
    assert_eq!(excluded.method, TestMethod::Exact);

    let config = PairedConfig {
        zero_policy: ZeroPolicy::Pratt,
        ..PairedConfig::default()
    };
    let pratt = compare_paired(&before, &after, &config);
    let pratt = pratt.computed().expect("computed");
    assert_eq!(pratt.method, TestMethod::NormalApproximation);
    assert_eq!(pratt.zero_policy, ZeroPolicy::Pratt);
    assert_eq!(pratt.effect_size, 1.0);
}

#[test]
fn pratt_zero_ties_are_not_corrected_twice() {
    let before = by_app(&[
        ("a", 7.0),
        ("b", 7.0),
        ("c", 11.0),
        ("d", 12.0),
        ("e", 13.0),
        ("f", 14.0),
        ("g", 15.0),
    ]);
    let after = by_app(&[
        ("a", 7.0),
        ("b", 7.0),
        ("c", 10.0),
        ("d", 10.0),
        ("e", 10.0),
        ("f", 10.0),
        ("g", 10.0),
    ]);
    let config = PairedConfig {
        zero_policy: ZeroPolicy::Pratt,
        ..PairedConfig::default()
    };
    let outcome = compare_paired(&before, &after, &config);
    let result = outcome.computed().expect("computed");

    // differences 0, 0, 1..5: R+ = 25, mean 14 - 1.5, variance (840 - 30) / 24
    let expected = (25.0 - 12.5) / (810.0_f64 / 24.0).sqrt();
    assert_eq!(result.method, TestMethod::NormalApproximation);
    assert_eq!(result.unchanged, 2);
    assert!(close(result.z_score.expect("z"), expected, 1e-9));
}

#[test]
fn unpaired_exact_for_separated_groups() {
    let outcome = compare_unpaired(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &UnpairedConfig::default());
    let result = outcome.computed().expect("computed");
    assert_eq!(result.method, TestMethod::Exact);
    assert_eq!(result.u_statistic, 0.0);
    assert!(close(result.p_value, 0.1, 1e-12));
    assert_eq!(result.rank_biserial, 1.0);
    assert_eq!(result.median_difference, 3.0);
}

#[test]
fn unpaired_ties_use_normal_approximation() {
    let a = [0.1, 0.2, 0.2, 0.3, 0.4];
    let b = [0.2, 0.5, 0.6, 0.6, 0.7];
    let outcome = compare_unpaired(&a, &b, &UnpairedConfig::default());
    let result = outcome.computed().expect("computed");
    assert_eq!(result.method, TestMethod::NormalApproximation);
    assert!(result.z_score.is_some_and(|z| z < 0.0));
    assert!(result.rank_biserial > 0.0);
    assert!(result.p_value > 0.0 && result.p_value < 0.1);
}

#[test]
fn unpaired_rejects_tiny_or_constant_groups() {
    let small = compare_unpaired(&[1.0], &[2.0, 3.0], &UnpairedConfig::default());
    assert_eq!(
        small,
        Outcome::InsufficientData {
            observed: 1,
            required: 2
        }
    );

    let constant = compare_unpaired(&[2.0, 2.0], &[2.0, 2.0, 2.0], &UnpairedConfig::default());
    assert!(matches!(constant, Outcome::Degenerate { .. }));
}

#[test]
fn mcnemar_counts_discordant_pairs() {
    let before: BTreeMap<String, bool> = ["a", "b", "c", "d", "e", "f", "g"]
        .into_iter()
        .map(|app| (app.to_string(), app == "g"))
        .collect();
    let after: BTreeMap<String, bool> = before
        .keys()
        .map(|app| (app.clone(), true))
        .collect();

    let outcome = compare_binary_paired(&before, &after, 0.05);
    let result = outcome.computed().expect("computed");
    assert_eq!(result.n_pairs, 7);
    assert_eq!(result.gained, 6);
    assert_eq!(result.lost, 0);
    assert_eq!(result.both_success, 1);
    assert!(close(result.p_value, 2.0 / 64.0, 1e-12));
    assert!(result.significant);

    let unchanged = compare_binary_paired(&after, &after, 0.05);
    assert!(matches!(unchanged, Outcome::Degenerate { .. }));
}

#[test]
fn outcome_serializes_with_status_tag() {
    let outcome: Outcome<PairedComparison> = Outcome::MissingStage {
        stage: Stage::WithIrCorrected,
    };
    let value = serde_json::to_value(&outcome).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({"status": "missing_stage", "stage": "with_ir_corrected"})
    );
}
