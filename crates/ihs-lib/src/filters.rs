use crate::error::{AnalysisError, Result};

/// Moving average over `window_size + 1` consecutive points.
///
/// Produces `len - window_size - 1` values (empty when the input is too short).
/// Times and values smoothed with the same `window_size` stay paired.
pub fn smooth(ys: &[f64], window_size: usize) -> Vec<f64> {
    let span = window_size + 1;
    if ys.len() <= span {
        return Vec::new();
    }
    ys.windows(span)
        .take(ys.len() - span)
        .map(|w| w.iter().sum::<f64>() / span as f64)
        .collect()
}

/// Overlapping segments of `window_size` values, one per start index.
pub fn moving_window_segments(data: &[f64], window_size: usize) -> Vec<&[f64]> {
    if window_size == 0 || window_size >= data.len() {
        return Vec::new();
    }
    (0..data.len() - window_size)
        .map(|i| &data[i..i + window_size])
        .collect()
}

/// Slopes between consecutive points, assuming the spacing of the first pair.
pub fn consecutive_slopes(ys: &[f64], xs: &[f64]) -> Result<Vec<f64>> {
    if ys.len() < 2 || xs.len() < 2 {
        return Err(AnalysisError::InsufficientData(
            "consecutive slopes need at least two points".into(),
        ));
    }
    let period = xs[1] - xs[0];
    if period == 0.0 || !period.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "sample period must be non-zero, got {period}"
        )));
    }
    Ok(ys.windows(2).map(|w| (w[1] - w[0]) / period).collect())
}
