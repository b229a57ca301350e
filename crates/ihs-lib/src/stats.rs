//! Descriptive statistics and Student's t helpers.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Descriptive {
    pub n: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub stdev: f64,
    /// Standard error of the mean (`stdev / sqrt(n)`).
    pub stderr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTest {
    pub t: f64,
    pub df: usize,
    /// Two-sided p value.
    pub p_value: f64,
}

pub fn mean(sample: &[f64]) -> Option<f64> {
    if sample.is_empty() {
        None
    } else {
        Some(sample.iter().sum::<f64>() / sample.len() as f64)
    }
}

pub fn descriptive_stats(sample: &[f64]) -> Result<Descriptive> {
    let mean = mean(sample)
        .ok_or_else(|| AnalysisError::InsufficientData("empty sample".into()))?;
    let n = sample.len();
    let var = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let stdev = var.sqrt();
    Ok(Descriptive {
        n,
        mean,
        stdev,
        stderr: stdev / (n as f64).sqrt(),
    })
}

/// Paired two-sided t-test on `a - b`.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<TTest> {
    if a.len() != b.len() {
        return Err(AnalysisError::InvalidParameter(format!(
            "paired samples differ in length ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let n = a.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData(
            "paired t-test needs at least two pairs".into(),
        ));
    }
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let mean_diff = diffs.iter().sum::<f64>() / n as f64;
    let var = diffs.iter().map(|d| (d - mean_diff).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    let df = n - 1;
    if var == 0.0 {
        if mean_diff == 0.0 {
            return Err(AnalysisError::InsufficientData(
                "all paired differences are zero".into(),
            ));
        }
        return Ok(TTest {
            t: mean_diff.signum() * f64::INFINITY,
            df,
            p_value: 0.0,
        });
    }
    let t = mean_diff / (var / n as f64).sqrt();
    Ok(TTest {
        t,
        df,
        p_value: student_t_two_sided_p(t, df as f64),
    })
}

/// Two-sided tail probability of Student's t with `df` degrees of freedom.
pub fn student_t_two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(0.5 * df, 0.5, x).clamp(0.0, 1.0)
}

fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut ser = 1.000_000_000_190_015;
    for c in COEFFS {
        y += 1.0;
        ser += c / y;
    }
    -tmp + (2.506_628_274_631_000_5 * ser / x).ln()
}

fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Modified Lentz evaluation of the incomplete beta continued fraction.
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 3.0e-14;
    const FPMIN: f64 = 1.0e-300;
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptive_uses_population_stdev() {
        let d = descriptive_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(d.n, 8);
        assert!((d.mean - 5.0).abs() < 1e-12);
        assert!((d.stdev - 2.0).abs() < 1e-12);
        assert!((d.stderr - 2.0 / 8f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn descriptive_rejects_empty() {
        assert!(matches!(
            descriptive_stats(&[]),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn cauchy_tail_matches_closed_form() {
        // df = 1 is the Cauchy distribution: P(|T| > 1) = 0.5
        assert!((student_t_two_sided_p(1.0, 1.0) - 0.5).abs() < 1e-9);
        assert!((student_t_two_sided_p(0.0, 7.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn large_df_approaches_normal() {
        // two-sided normal tail at 1.96 is ~0.05
        let p = student_t_two_sided_p(1.959_963_984_540_054, 1.0e6);
        assert!((p - 0.05).abs() < 1e-4, "p = {p}");
    }

    #[test]
    fn paired_t_test_reference_value() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let result = paired_t_test(&a, &b).unwrap();
        assert_eq!(result.df, 4);
        assert!((result.t + 4.242_640_687_119_285).abs() < 1e-9);
        assert!((result.p_value - 0.013_236).abs() < 1e-4, "p = {}", result.p_value);
    }

    #[test]
    fn paired_t_test_constant_shift() {
        let result = paired_t_test(&[2.0, 3.0, 4.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(result.p_value, 0.0);
        assert!(result.t.is_infinite() && result.t > 0.0);
        assert!(paired_t_test(&[1.0, 2.0], &[1.0, 2.0]).is_err());
        assert!(paired_t_test(&[1.0, 2.0], &[1.0]).is_err());
    }
}
