use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Paired timestamps (minutes) and values, strictly increasing in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "time series has {} timestamps but {} values",
                times.len(),
                values.len()
            )));
        }
        check_increasing(&times)?;
        Ok(Self { times, values })
    }

    /// Series with uniformly spaced timestamps starting at zero.
    pub fn uniform(values: Vec<f64>, period: f64) -> Result<Self> {
        let times = (0..values.len()).map(|i| i as f64 * period).collect();
        Self::new(times, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.times
            .iter()
            .zip(&self.values)
            .map(|(t, v)| [*t, *v])
            .collect()
    }
}

/// Reject timestamps that are non-finite or not strictly increasing.
pub(crate) fn check_increasing(times: &[f64]) -> Result<()> {
    if let Some(idx) = times.iter().position(|t| !t.is_finite()) {
        return Err(AnalysisError::InvalidParameter(format!(
            "timestamp at index {idx} is not finite"
        )));
    }
    if let Some(idx) = times.windows(2).position(|w| w[1] <= w[0]) {
        return Err(AnalysisError::InvalidParameter(format!(
            "timestamps must be strictly increasing (index {})",
            idx + 1
        )));
    }
    Ok(())
}

/// Half-open index range `[start, end)` into a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a, T>(&self, data: &'a [T]) -> &'a [T] {
        &data[self.start..self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_increasing_times() {
        let err = TimeSeries::new(vec![0.0, 1.0, 1.0], vec![1.0; 3]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(_)));
    }

    #[test]
    fn rejects_non_finite_times() {
        for times in [
            vec![f64::NAN, 1.0, 2.0],
            vec![0.0, f64::INFINITY, 2.0],
            vec![0.0, 1.0, f64::NAN],
        ] {
            let err = TimeSeries::new(times, vec![1.0; 3]).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidParameter(_)));
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(TimeSeries::new(vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn uniform_spacing() {
        let ts = TimeSeries::uniform(vec![1.0, 2.0, 3.0], 0.5).unwrap();
        assert_eq!(ts.times, vec![0.0, 0.5, 1.0]);
        assert_eq!(ts.points()[2], [1.0, 3.0]);
    }

    #[test]
    fn window_slices_half_open() {
        let w = Window::new(1, 3);
        assert_eq!(w.slice(&[0, 1, 2, 3]), &[1, 2]);
        assert_eq!(w.len(), 2);
    }
}
