use anyhow::{bail, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TTest {
    pub t_statistic: f64,
    pub p_value: f64,
}

pub fn describe(values: &[f64]) -> Option<DescriptiveStats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|left, right| left.total_cmp(right));

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let std = sample_std(&sorted, mean);

    Some(DescriptiveStats {
        count,
        mean,
        std,
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    })
}

/// Student's independent two-sample t-test with pooled variance (equal-variance
/// assumption). Two-sided p-value from the t distribution CDF.
pub fn student_t_test(sample_a: &[f64], sample_b: &[f64]) -> Result<TTest> {
    if sample_a.len() < 2 || sample_b.len() < 2 {
        bail!(
            "t-test requires at least 2 observations per sample (got {} and {})",
            sample_a.len(),
            sample_b.len()
        );
    }

    let n_a = sample_a.len() as f64;
    let n_b = sample_b.len() as f64;
    let mean_a = sample_a.iter().sum::<f64>() / n_a;
    let mean_b = sample_b.iter().sum::<f64>() / n_b;
    let var_a = sum_squared_deviations(sample_a, mean_a) / (n_a - 1.0);
    let var_b = sum_squared_deviations(sample_b, mean_b) / (n_b - 1.0);

    let df = n_a + n_b - 2.0;
    let pooled_var = ((n_a - 1.0) * var_a + (n_b - 1.0) * var_b) / df;
    let standard_error = (pooled_var * (1.0 / n_a + 1.0 / n_b)).sqrt();
    let mean_diff = mean_a - mean_b;

    if standard_error == 0.0 {
        // Zero pooled variance: identical constants on both sides means no
        // detectable difference; any nonzero shift is infinitely significant.
        return Ok(if mean_diff == 0.0 {
            TTest {
                t_statistic: 0.0,
                p_value: 1.0,
            }
        } else {
            TTest {
                t_statistic: f64::INFINITY.copysign(mean_diff),
                p_value: 0.0,
            }
        });
    }

    let t_statistic = mean_diff / standard_error;
    let p_value = two_sided_p_value(t_statistic, df);

    Ok(TTest {
        t_statistic,
        p_value,
    })
}

fn two_sided_p_value(t_statistic: f64, df: f64) -> f64 {
    let x = df / (df + t_statistic * t_statistic);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some((sum_squared_deviations(values, mean) / (values.len() as f64 - 1.0)).sqrt())
}

fn sum_squared_deviations(values: &[f64], mean: f64) -> f64 {
    values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
}

/// Linear interpolation between closest ranks, matching the conventional
/// quartile definition used by descriptive-summary tables.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let count = sorted.len();
    if count == 1 {
        return sorted[0];
    }

    let position = q * (count - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    let fraction = position - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * fraction
}

fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

// Lentz's method for the incomplete beta continued fraction.
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 200;
    const EPSILON: f64 = 3.0e-14;
    const TINY: f64 = 1.0e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m_f = m as f64;
        let m2 = 2.0 * m_f;

        let numerator = m_f * (b - m_f) * x / ((qam + m2) * (a + m2));
        d = 1.0 + numerator * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + numerator / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let numerator = -(a + m_f) * (qab + m_f) * x / ((a + m2) * (qap + m2));
        d = 1.0 + numerator * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + numerator / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    h
}

// Lanczos approximation, valid for positive arguments.
fn ln_gamma(value: f64) -> f64 {
    const COEFFICIENTS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];

    let x = value;
    let mut y = value;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut series = 1.000_000_000_190_015;
    for coefficient in COEFFICIENTS {
        y += 1.0;
        series += coefficient / y;
    }

    -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}

#[cfg(test)]
mod tests {
    use super::{describe, student_t_test};

    #[test]
    fn identical_samples_show_no_detectable_difference() {
        let sample = vec![0.95, 0.90, 0.92, 0.88, 0.94];
        let result = student_t_test(&sample, &sample).expect("t-test should run");
        assert_eq!(result.t_statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn widely_separated_samples_are_significant() {
        let fast = vec![10.0, 12.0, 11.0, 13.0, 9.0, 12.0];
        let slow = vec![150.0, 200.0, 180.0, 220.0, 190.0, 210.0];
        let result = student_t_test(&fast, &slow).expect("t-test should run");
        assert!(
            result.p_value < 0.05,
            "unexpected p-value: {}",
            result.p_value
        );
        assert!(result.t_statistic < 0.0);
    }

    #[test]
    fn t_statistic_matches_hand_computed_reference() {
        // means 3 and 4, pooled variance 2.5, standard error exactly 1.
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = vec![2.0, 3.0, 4.0, 5.0, 6.0];
        let result = student_t_test(&a, &b).expect("t-test should run");
        assert!((result.t_statistic - (-1.0)).abs() < 1e-12);
        // two-sided p for |t| = 1 at 8 degrees of freedom
        assert!((result.p_value - 0.3466).abs() < 5e-3, "p = {}", result.p_value);
    }

    #[test]
    fn constant_samples_with_a_shift_are_infinitely_significant() {
        let a = vec![5.0, 5.0, 5.0];
        let b = vec![7.0, 7.0, 7.0];
        let result = student_t_test(&a, &b).expect("t-test should run");
        assert!(result.t_statistic.is_infinite());
        assert_eq!(result.p_value, 0.0);
    }

    #[test]
    fn undersized_samples_are_rejected() {
        let error = student_t_test(&[1.0], &[2.0, 3.0]).expect_err("one observation is not enough");
        assert!(error.to_string().contains("at least 2 observations"));
    }

    #[test]
    fn describe_reports_quartiles_with_linear_interpolation() {
        let stats = describe(&[4.0, 1.0, 3.0, 2.0]).expect("stats should be computed");
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.q1, 1.75);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q3, 3.25);
        assert_eq!(stats.max, 4.0);
        let std = stats.std.expect("std should be present");
        assert!((std - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn describe_handles_degenerate_inputs() {
        assert!(describe(&[]).is_none());

        let single = describe(&[42.0]).expect("single observation should describe");
        assert_eq!(single.count, 1);
        assert_eq!(single.median, 42.0);
        assert!(single.std.is_none());
    }
}
