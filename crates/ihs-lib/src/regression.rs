use crate::error::{AnalysisError, Result};
use crate::stats::student_t_two_sided_p;
use serde::{Deserialize, Serialize};

/// Ordinary least squares fit of `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub r_value: f64,
    /// Two-sided p value for a non-zero slope.
    pub p_value: f64,
    /// Standard error of the slope.
    pub stderr: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Result<LinearFit> {
    if xs.len() != ys.len() {
        return Err(AnalysisError::DegenerateRegression(format!(
            "{} x values but {} y values",
            xs.len(),
            ys.len()
        )));
    }
    let n = xs.len();
    if n < 2 {
        return Err(AnalysisError::DegenerateRegression(format!(
            "need at least 2 points, got {n}"
        )));
    }
    let n_f = n as f64;
    let mean_x = xs.iter().sum::<f64>() / n_f;
    let mean_y = ys.iter().sum::<f64>() / n_f;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 || !sxx.is_finite() {
        return Err(AnalysisError::DegenerateRegression(
            "x values have zero variance".into(),
        ));
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_value = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let (stderr, p_value) = if n == 2 {
        (0.0, if syy == 0.0 { 1.0 } else { 0.0 })
    } else {
        let df = n_f - 2.0;
        let stderr = ((1.0 - r_value * r_value).max(0.0) * syy / sxx / df).sqrt();
        let denom = (1.0 - r_value) * (1.0 + r_value);
        let p = if denom <= 0.0 {
            0.0
        } else {
            let t = r_value * (df / denom).sqrt();
            student_t_two_sided_p(t, df)
        };
        (stderr, p)
    };

    Ok(LinearFit {
        n,
        slope,
        intercept,
        r_value,
        p_value,
        stderr,
    })
}

/// Fit `ys` against evenly spaced times `i * sample_period`.
pub fn regression_with_period(ys: &[f64], sample_period: f64) -> Result<LinearFit> {
    let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64 * sample_period).collect();
    linear_regression(&xs, ys)
}

/// Slope of one segment in value units per time unit of `sample_period`.
pub fn segment_slope(segment: &[f64], sample_period: f64) -> Result<f64> {
    regression_with_period(segment, sample_period).map(|fit| fit.slope)
}

pub fn segment_slopes(segments: &[&[f64]], sample_period: f64) -> Result<Vec<f64>> {
    segments
        .iter()
        .map(|segment| segment_slope(segment, sample_period))
        .collect()
}
