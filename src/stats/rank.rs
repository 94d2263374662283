use serde::Serialize;

use super::distribution::student_t_two_sided_p;

pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0usize;
    while i < n {
        let value = values[indices[i]];
        let mut j = i + 1;
        while j < n && values[indices[j]] == value {
            j += 1;
        }
        let avg_rank = (i + j + 1) as f64 / 2.0;
        for &index in &indices[i..j] {
            ranks[index] = avg_rank;
        }
        i = j;
    }

    ranks
}

pub fn tie_group_sizes(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|left, right| left.total_cmp(right));

    let mut sizes = Vec::new();
    let mut i = 0usize;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        sizes.push(j - i);
        i = j;
    }
    sizes
}

pub fn tie_correction_term(values: &[f64]) -> f64 {
    tie_group_sizes(values)
        .into_iter()
        .map(|t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum()
}

pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    if den_x == 0.0 || den_y == 0.0 {
        None
    } else {
        Some((num / (den_x.sqrt() * den_y.sqrt())).clamp(-1.0, 1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub n: usize,
    pub rho: f64,
    pub p_value: f64,
}

pub fn spearman(x: &[f64], y: &[f64]) -> Option<Correlation> {
    let n = x.len();
    if n != y.len() || n < 3 {
        return None;
    }
    let rho = pearson(&average_ranks(x), &average_ranks(y))?;
    let df = (n - 2) as f64;
    let p_value = if (1.0 - rho.abs()) <= 1e-12 {
        0.0
    } else {
        let t = rho * (df / ((1.0 - rho) * (1.0 + rho))).sqrt();
        student_t_two_sided_p(t, df)
    };
    Some(Correlation { n, rho, p_value })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r = pearson(x, y).unwrap_or(0.0);
    Some(LinearFit {
        n,
        slope,
        intercept,
        r_squared: r * r,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_ranks_split_ties() {
        let ranks = average_ranks(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(ranks, vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn tie_term_counts_only_groups() {
        assert_eq!(tie_correction_term(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(tie_correction_term(&[1.0, 1.0, 2.0, 2.0, 2.0, 5.0]), 30.0);
    }

    #[test]
    fn spearman_detects_monotone_relationships() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 9.0, 16.0, 40.0];
        let correlation = spearman(&x, &y).expect("correlation");
        assert!((correlation.rho - 1.0).abs() < 1e-12);
        assert_eq!(correlation.p_value, 0.0);

        let constant = [3.0; 5];
        assert!(spearman(&x, &constant).is_none());
        assert!(spearman(&x[..2], &y[..2]).is_none());
    }

    #[test]
    fn spearman_p_value_for_partial_agreement() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [2.0, 1.0, 4.0, 3.0, 6.0, 5.0];
        let correlation = spearman(&x, &y).expect("correlation");
        assert!((correlation.rho - 0.828_571_428_6).abs() < 1e-9);
        assert!(correlation.p_value > 0.01 && correlation.p_value < 0.1);
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let x = [1.0, 2.0, 3.0];
        let y = [3.0, 5.0, 7.0];
        let fit = linear_fit(&x, &y).expect("fit");
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(linear_fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }
}
