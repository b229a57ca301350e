//! Time-window to index-window resolution.
//!
//! Every selector in this crate uses the same convention: a value window
//! `[range_start, range_end]` is inclusive on both ends and resolves to the
//! half-open index window `[start, end)`, where `start` is the first sample
//! `>= range_start` and `end - 1` is the last sample `<= range_end`.

use crate::error::{AnalysisError, Result};
use crate::signal::Window;

/// Resolve a time window on monotonically increasing `xs`.
pub fn range_index(xs: &[f64], range_start: f64, range_end: f64) -> Result<Window> {
    if range_start.is_nan() || range_end.is_nan() {
        return Err(AnalysisError::InvalidParameter(
            "range bounds must not be NaN".into(),
        ));
    }
    if range_start > range_end {
        return Err(AnalysisError::InvalidParameter(format!(
            "range start {range_start} is after range end {range_end}"
        )));
    }
    let start = xs.partition_point(|&x| x < range_start);
    let end = xs.partition_point(|&x| x <= range_end);
    if start >= end {
        return Err(AnalysisError::InsufficientData(format!(
            "no samples between {range_start} and {range_end} (data spans {})",
            describe_span(xs)
        )));
    }
    Ok(Window::new(start, end))
}

fn describe_span(xs: &[f64]) -> String {
    match (xs.first(), xs.last()) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "nothing".into(),
    }
}

fn checked_pair<'a>(
    ys: &'a [f64],
    xs: &[f64],
    start: f64,
    end: f64,
) -> Result<(&'a [f64], Window)> {
    if ys.len() != xs.len() {
        return Err(AnalysisError::InvalidParameter(format!(
            "{} values but {} timestamps",
            ys.len(),
            xs.len()
        )));
    }
    let window = range_index(xs, start, end)?;
    Ok((window.slice(ys), window))
}

/// Mean of `ys` where `xs` falls inside `[start, end]`.
pub fn range_mean(ys: &[f64], xs: &[f64], start: f64, end: f64) -> Result<f64> {
    let (values, _) = checked_pair(ys, xs, start, end)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn range_max(ys: &[f64], xs: &[f64], start: f64, end: f64) -> Result<f64> {
    let (values, _) = checked_pair(ys, xs, start, end)?;
    Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Minimum of `ys` inside the window and its index in `ys` (first on ties).
pub fn range_min(ys: &[f64], xs: &[f64], start: f64, end: f64) -> Result<(f64, usize)> {
    let (values, window) = checked_pair(ys, xs, start, end)?;
    let mut best = (values[0], window.start);
    for (offset, &value) in values.iter().enumerate().skip(1) {
        if value < best.0 {
            best = (value, window.start + offset);
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XS: [f64; 6] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];

    #[test]
    fn interior_window() {
        let w = range_index(&XS, 1.5, 3.5).unwrap();
        assert_eq!(w, Window::new(2, 4));
        assert_eq!(w.slice(&XS), &[2.0, 3.0]);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(range_index(&XS, 1.0, 3.0).unwrap(), Window::new(1, 4));
    }

    #[test]
    fn clamps_outside_bounds() {
        assert_eq!(range_index(&XS, -10.0, 99.0).unwrap(), Window::new(0, 6));
        assert_eq!(range_index(&XS, 4.5, 99.0).unwrap(), Window::new(5, 6));
    }

    #[test]
    fn empty_window_is_explicit_error() {
        for (a, b) in [(6.0, 9.0), (-3.0, -1.0), (2.2, 2.8)] {
            assert!(matches!(
                range_index(&XS, a, b),
                Err(AnalysisError::InsufficientData(_))
            ));
        }
        assert!(matches!(
            range_index(&[], 0.0, 1.0),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn reversed_bounds_rejected() {
        assert!(matches!(
            range_index(&XS, 3.0, 1.0),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn range_statistics() {
        let ys = [5.0, -1.0, 3.0, -4.0, 8.0, -4.0];
        assert_eq!(range_mean(&ys, &XS, 0.5, 2.5).unwrap(), 1.0);
        assert_eq!(range_max(&ys, &XS, 0.5, 4.0).unwrap(), 8.0);
        assert_eq!(range_min(&ys, &XS, 0.0, 5.0).unwrap(), (-4.0, 3));
        assert!(range_min(&ys[..2], &XS, 0.0, 5.0).is_err());
    }
}
