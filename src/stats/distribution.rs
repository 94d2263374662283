use std::f64::consts::{PI, SQRT_2};

/// Abramowitz and Stegun 7.1.26; absolute error below 1.5e-7.
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

pub fn normal_cdf(z: f64) -> f64 {
    (0.5 * (1.0 + erf(z / SQRT_2))).clamp(0.0, 1.0)
}

pub fn normal_sf(z: f64) -> f64 {
    normal_cdf(-z)
}

pub fn ln_gamma(x: f64) -> f64 {
    let g = 7;
    let c = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        PI.ln() - (PI * x).sin().ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut a = c[0];
        for (i, coefficient) in c.iter().enumerate().skip(1) {
            a += coefficient / (x + i as f64);
        }
        let t = x + g as f64 + 0.5;
        0.5 * (2.0 * PI).ln() + (t - 0.5) * t.ln() - t + a.ln()
    }
}

pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let bt = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        bt * beta_cf(a, b, x) / a
    } else {
        1.0 - bt * beta_cf(b, a, 1.0 - x) / b
    }
}

fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 1e-12;
    const TINY: f64 = 1e-30;

    let guard = |value: f64| if value.abs() < TINY { TINY } else { value };

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - (a + b) * x / (a + 1.0));
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((a + m2 - 1.0) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (a + b + m) * x / ((a + m2) * (a + m2 + 1.0));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }

    h
}

pub fn student_t_two_sided_p(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    incomplete_beta(df / 2.0, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

pub fn binomial_pmf_half(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }

    let mut coefficient = 1.0_f64;
    let top_k = k.min(n - k);
    for i in 0..top_k {
        coefficient *= (n - i) as f64 / (i + 1) as f64;
    }
    coefficient * 0.5_f64.powi(n as i32)
}

pub fn binomial_cdf_half(n: usize, k: usize) -> f64 {
    (0..=k.min(n))
        .map(|i| binomial_pmf_half(n, i))
        .sum::<f64>()
        .min(1.0)
}

pub fn signed_rank_counts(n: usize) -> Vec<f64> {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0_f64; max_sum + 1];
    counts[0] = 1.0;
    for rank in 1..=n {
        for sum in (rank..=max_sum).rev() {
            let carried = counts[sum - rank];
            counts[sum] += carried;
        }
    }
    counts
}

pub fn rank_sum_counts(n1: usize, n2: usize) -> Vec<f64> {
    let n = n1 + n2;
    let max_sum = n * (n + 1) / 2;
    let mut ways = vec![vec![0.0_f64; max_sum + 1]; n1 + 1];
    ways[0][0] = 1.0;
    for rank in 1..=n {
        for k in (1..=n1.min(rank)).rev() {
            for sum in (rank..=max_sum).rev() {
                let carried = ways[k - 1][sum - rank];
                ways[k][sum] += carried;
            }
        }
    }

    let offset = n1 * (n1 + 1) / 2;
    let mut counts = vec![0.0_f64; n1 * n2 + 1];
    for (sum, ways) in ways[n1].iter().enumerate().skip(offset) {
        let u = sum - offset;
        if u < counts.len() {
            counts[u] += ways;
        }
    }
    counts
}

pub fn discrete_tails(counts: &[f64], observed: usize) -> (f64, f64) {
    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return (1.0, 1.0);
    }
    let upper: f64 = counts.iter().skip(observed).sum();
    let lower: f64 = counts.iter().take(observed + 1).sum();
    ((upper / total).min(1.0), (lower / total).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
        (actual - expected).abs() <= tolerance
    }

    #[test]
    fn normal_cdf_matches_reference_points() {
        assert!(close(normal_cdf(0.0), 0.5, 1e-7));
        assert!(close(normal_cdf(1.959964), 0.975, 1e-6));
        assert!(close(normal_sf(1.644854), 0.05, 1e-6));
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!(close(ln_gamma(5.0), 24.0_f64.ln(), 1e-10));
        assert!(close(ln_gamma(0.5), PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn student_t_two_sided_p_matches_tables() {
        assert!(close(student_t_two_sided_p(2.228, 10.0), 0.05, 5e-4));
        assert!(close(student_t_two_sided_p(0.0, 4.0), 1.0, 1e-9));
    }

    #[test]
    fn binomial_cdf_half_is_symmetric() {
        assert!(close(binomial_cdf_half(4, 0), 1.0 / 16.0, 1e-12));
        assert!(close(binomial_cdf_half(6, 3) + binomial_cdf_half(6, 2), 1.0, 1e-12));
        assert!(close(binomial_cdf_half(3, 9), 1.0, 1e-12));
    }

    #[test]
    fn signed_rank_counts_cover_all_sign_assignments() {
        let counts = signed_rank_counts(4);
        assert_eq!(counts.len(), 11);
        assert_eq!(counts.iter().sum::<f64>(), 16.0);
        assert_eq!(counts[0], 1.0);
        assert_eq!(counts[5], 2.0);
    }

    #[test]
    fn rank_sum_counts_cover_all_arrangements() {
        let counts = rank_sum_counts(3, 2);
        assert_eq!(counts.len(), 7);
        assert_eq!(counts.iter().sum::<f64>(), 10.0);
        assert_eq!(counts, vec![1.0, 1.0, 2.0, 2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn discrete_tails_include_the_observed_value() {
        let counts = vec![1.0, 2.0, 1.0];
        let (upper, lower) = discrete_tails(&counts, 1);
        assert!(close(upper, 0.75, 1e-12));
        assert!(close(lower, 0.75, 1e-12));
    }
}
