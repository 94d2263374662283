use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Option<Summary> {
    let sorted = sorted_copy(values);
    let (first, last) = (sorted.first().copied()?, sorted.last().copied()?);
    Some(Summary {
        count: sorted.len(),
        mean: mean(&sorted)?,
        std: sample_std(&sorted),
        min: first,
        q1: quantile_sorted(&sorted, 0.25)?,
        median: quantile_sorted(&sorted, 0.5)?,
        q3: quantile_sorted(&sorted, 0.75)?,
        max: last,
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let sum_sq = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Linear interpolation between closest ranks, as in numpy/pandas defaults.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted_copy(values), q)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|left, right| left.total_cmp(right));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_interpolate_linearly() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&values), Some(2.5));
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.75), Some(3.25));
        assert_eq!(quantile(&values, 1.5), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn describe_reports_sample_std() {
        let summary = describe(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("summary");
        assert_eq!(summary.count, 8);
        assert_eq!(summary.mean, 5.0);
        let std = summary.std.expect("std");
        assert!((std - 2.138_089_935).abs() < 1e-9, "unexpected std: {std}");
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
    }

    #[test]
    fn single_value_has_no_std() {
        let summary = describe(&[3.0]).expect("summary");
        assert_eq!(summary.std, None);
        assert_eq!(summary.median, 3.0);
        assert!(describe(&[]).is_none());
    }
}
