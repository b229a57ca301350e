use crate::{
    config::AnalysisConfig,
    error::{AnalysisError, Result},
    filters::{moving_window_segments, smooth},
    range::{range_index, range_min},
    recording::{first_tag_time, mean_by_sweep, Recording},
    regression::{linear_regression, segment_slopes},
    signal::{check_increasing, TimeSeries},
};
use serde::{Deserialize, Serialize};

/// Parameters of the baseline / drug slope detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeConfig {
    /// Moving-average size (sweeps) applied to currents and times.
    pub filter_size: usize,
    /// Points per local regression during the drug search.
    pub regression_size: usize,
    /// Length of the baseline window ending at the event (minutes).
    pub baseline_window_minutes: f64,
    /// Length of the drug-search window starting at the event (minutes).
    pub drug_search_width_minutes: f64,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self {
            filter_size: 10,
            regression_size: 17,
            baseline_window_minutes: 4.0,
            drug_search_width_minutes: 5.0,
        }
    }
}

impl SlopeConfig {
    fn validate(&self) -> Result<()> {
        if self.regression_size < 2 {
            return Err(AnalysisError::InvalidParameter(format!(
                "regression size must be at least 2, got {}",
                self.regression_size
            )));
        }
        for (name, value) in [
            ("baseline window", self.baseline_window_minutes),
            ("drug search width", self.drug_search_width_minutes),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidParameter(format!(
                    "{name} must be a non-negative number of minutes, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Baseline slope, peak drug slope, and the traces they were measured on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeAnalysis {
    pub event_time: f64,
    pub baseline_slope: f64,
    pub baseline_intercept: f64,
    pub drug_slope_min: f64,
    pub drug_slope_min_time: f64,
    pub baseline_window: [f64; 2],
    pub drug_window: [f64; 2],
    /// Smoothed currents against smoothed times.
    pub smoothed: TimeSeries,
    /// Local regression slopes against the trailing edge of each segment.
    pub local_slopes: TimeSeries,
}

impl SlopeAnalysis {
    pub fn delta(&self) -> f64 {
        self.drug_slope_min - self.baseline_slope
    }
}

fn within(window: &str, err: AnalysisError) -> AnalysisError {
    match err {
        AnalysisError::InsufficientData(msg) => {
            AnalysisError::InsufficientData(format!("{window} window: {msg}"))
        }
        AnalysisError::DegenerateRegression(msg) => {
            AnalysisError::DegenerateRegression(format!("{window} window: {msg}"))
        }
        other => other,
    }
}

/// Measure the baseline slope before `event_time` and the most negative local
/// slope after it.
///
/// `times` are per-sweep timestamps in minutes, `currents` the per-sweep
/// means, and `sample_period` the sweep interval in minutes used to turn
/// local index-domain slopes into rates per minute.
pub fn detect_slopes(
    times: &[f64],
    currents: &[f64],
    event_time: f64,
    sample_period: f64,
    cfg: &SlopeConfig,
) -> Result<SlopeAnalysis> {
    cfg.validate()?;
    if times.len() != currents.len() {
        return Err(AnalysisError::InvalidParameter(format!(
            "{} sweep times but {} current values",
            times.len(),
            currents.len()
        )));
    }
    check_increasing(times)?;
    if !sample_period.is_finite() || sample_period <= 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "sample period must be positive, got {sample_period}"
        )));
    }
    if !event_time.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "event time must be finite, got {event_time}"
        )));
    }

    let smooth_currents = smooth(currents, cfg.filter_size);
    let smooth_times = smooth(times, cfg.filter_size);
    if smooth_currents.is_empty() {
        return Err(AnalysisError::InsufficientData(format!(
            "{} sweeps cannot be smoothed with filter size {}",
            currents.len(),
            cfg.filter_size
        )));
    }

    let baseline_window = [event_time - cfg.baseline_window_minutes, event_time];
    let window = range_index(&smooth_times, baseline_window[0], baseline_window[1])
        .map_err(|err| within("baseline", err))?;
    let baseline = linear_regression(
        window.slice(&smooth_times),
        window.slice(&smooth_currents),
    )
    .map_err(|err| within("baseline", err))?;

    let segments = moving_window_segments(&smooth_currents, cfg.regression_size);
    let slopes = segment_slopes(&segments, sample_period)?;
    // each slope sits at the trailing edge of its segment, on the recording's clock
    let offset = cfg.regression_size as f64 * sample_period;
    let slope_times: Vec<f64> = (0..slopes.len())
        .map(|i| times[0] + i as f64 * sample_period + offset)
        .collect();

    let drug_window = [event_time, event_time + cfg.drug_search_width_minutes];
    let (drug_slope_min, min_index) =
        range_min(&slopes, &slope_times, drug_window[0], drug_window[1])
            .map_err(|err| within("drug search", err))?;

    Ok(SlopeAnalysis {
        event_time,
        baseline_slope: baseline.slope,
        baseline_intercept: baseline.intercept,
        drug_slope_min,
        drug_slope_min_time: slope_times[min_index],
        baseline_window,
        drug_window,
        smoothed: TimeSeries {
            times: smooth_times,
            values: smooth_currents,
        },
        local_slopes: TimeSeries {
            times: slope_times,
            values: slopes,
        },
    })
}

/// Sweep interval in minutes: mean spacing of sweep starts, or the sweep
/// length for single-sweep recordings.
pub fn sweep_period_min(rec: &dyn Recording) -> f64 {
    let times = rec.sweep_times_min();
    match (times.first(), times.last()) {
        (Some(first), Some(last)) if times.len() > 1 => (last - first) / (times.len() - 1) as f64,
        _ => rec.sweep_length_sec() / 60.0,
    }
}

/// Per-sweep mean holding current against sweep start time (minutes).
pub fn holding_current(rec: &dyn Recording, cfg: &AnalysisConfig) -> Result<TimeSeries> {
    let currents = mean_by_sweep(rec, cfg.channel, cfg.measure_start_sec, cfg.measure_end_sec)?;
    TimeSeries::new(rec.sweep_times_min(), currents)
}

/// Reduce every sweep to its mean holding current and run [`detect_slopes`]
/// anchored on the first tag.
pub fn analyze_recording(rec: &dyn Recording, cfg: &AnalysisConfig) -> Result<SlopeAnalysis> {
    analyze_recording_with_trace(rec, cfg).map(|(_, analysis)| analysis)
}

/// Like [`analyze_recording`], also returning the per-sweep trace for plotting.
pub fn analyze_recording_with_trace(
    rec: &dyn Recording,
    cfg: &AnalysisConfig,
) -> Result<(TimeSeries, SlopeAnalysis)> {
    let event_time = first_tag_time(rec)?;
    let trace = holding_current(rec, cfg)?;
    let period = sweep_period_min(rec);
    log::debug!(
        "{}: {} sweeps, period {:.4} min, first tag at {:.3} min",
        rec.id(),
        trace.len(),
        period,
        event_time
    );
    let analysis = detect_slopes(&trace.times, &trace.values, event_time, period, &cfg.slope)?;
    Ok((trace, analysis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_recording() -> (Vec<f64>, Vec<f64>) {
        let currents = vec![
            100.0, 100.0, 100.0, 100.0, 100.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0,
            50.0, 50.0,
        ];
        let times = (0..currents.len()).map(|i| i as f64).collect();
        (times, currents)
    }

    fn small_config() -> SlopeConfig {
        SlopeConfig {
            filter_size: 1,
            regression_size: 3,
            ..SlopeConfig::default()
        }
    }

    #[test]
    fn step_down_after_event() {
        let (times, currents) = step_recording();
        let result = detect_slopes(&times, &currents, 5.0, 1.0, &small_config()).unwrap();
        assert_eq!(result.smoothed.len(), currents.len() - 2);
        assert_eq!(result.local_slopes.len(), result.smoothed.len() - 3);
        // the smoothed 100 -> 50 edge spans two local windows; the steepest is -25 pA/min
        assert!((result.drug_slope_min + 25.0).abs() < 1e-9);
        assert!((5.0..=10.0).contains(&result.drug_slope_min_time));
        assert_eq!(result.drug_slope_min_time, 6.0);
        assert!(result.baseline_slope.abs() < result.drug_slope_min.abs());
        assert!(result.delta() < 0.0);
    }

    #[test]
    fn flat_baseline_has_zero_slope() {
        let mut currents = vec![100.0; 12];
        currents.extend((1..=8).map(|i| 100.0 - 10.0 * i as f64));
        let times: Vec<f64> = (0..currents.len()).map(|i| i as f64).collect();
        let result = detect_slopes(&times, &currents, 11.0, 1.0, &small_config()).unwrap();
        assert!(result.baseline_slope.abs() < 1e-12);
        assert!((result.drug_slope_min + 10.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let (times, currents) = step_recording();
        let a = detect_slopes(&times, &currents, 5.0, 1.0, &small_config()).unwrap();
        let b = detect_slopes(&times, &currents, 5.0, 1.0, &small_config()).unwrap();
        assert_eq!(a.baseline_slope.to_bits(), b.baseline_slope.to_bits());
        assert_eq!(a.drug_slope_min.to_bits(), b.drug_slope_min.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn drug_window_past_end_is_insufficient_data() {
        let (times, currents) = step_recording();
        let err = detect_slopes(&times, &currents, 14.5, 1.0, &small_config()).unwrap_err();
        match err {
            AnalysisError::InsufficientData(msg) => assert!(msg.contains("drug search")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn baseline_before_recording_is_insufficient_data() {
        let (times, currents) = step_recording();
        let err = detect_slopes(&times, &currents, -6.0, 1.0, &small_config()).unwrap_err();
        match err {
            AnalysisError::InsufficientData(msg) => assert!(msg.contains("baseline")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn short_recording_is_insufficient_data() {
        let err = detect_slopes(&[0.0, 1.0], &[1.0, 2.0], 1.0, 1.0, &SlopeConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    fn tagged_recording(tag_min: Option<f64>) -> crate::recording::InMemoryRecording {
        use crate::recording::{Channel, InMemoryRecording, Tag};
        // 30 one-minute sweeps at 2 Hz; flat until minute 12, then -3 pA per sweep
        let sweeps = (0..30)
            .map(|i| {
                let level = if i < 12 { -20.0 } else { -20.0 - 3.0 * (i - 12) as f64 };
                vec![level; 120]
            })
            .collect();
        InMemoryRecording {
            id: "tagged".into(),
            data_rate: 2.0,
            channels: vec![Channel {
                name: "Im".into(),
                units: "pA".into(),
                sweeps,
            }],
            sweep_start_sec: None,
            tags: tag_min
                .map(|time_min| Tag {
                    time_min,
                    comment: "drug".into(),
                })
                .into_iter()
                .collect(),
        }
    }

    fn recording_config() -> AnalysisConfig {
        AnalysisConfig {
            slope: SlopeConfig {
                filter_size: 2,
                regression_size: 4,
                drug_search_width_minutes: 10.0,
                ..SlopeConfig::default()
            },
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn analyzes_recording_through_trait() {
        let rec = tagged_recording(Some(10.0));
        assert_eq!(sweep_period_min(&rec), 1.0);
        let result = analyze_recording(&rec, &recording_config()).unwrap();
        let (trace, _) = analyze_recording_with_trace(&rec, &recording_config()).unwrap();
        assert_eq!(trace.len(), 30);
        assert_eq!(trace.values[13], -23.0);
        assert!(result.baseline_slope.abs() < 1e-12);
        assert!((result.drug_slope_min + 3.0).abs() < 1e-9);
        assert_eq!(result.drug_slope_min_time, 16.0);
    }

    #[test]
    fn late_start_shifts_times_not_slopes() {
        let rec = tagged_recording(Some(10.0));
        let mut late = rec.clone();
        late.sweep_start_sec = Some((0..30).map(|i| 900.0 + 60.0 * i as f64).collect());
        late.tags[0].time_min = 25.0;
        let base = analyze_recording(&rec, &recording_config()).unwrap();
        let shifted = analyze_recording(&late, &recording_config()).unwrap();
        assert_eq!(base.baseline_slope.to_bits(), shifted.baseline_slope.to_bits());
        assert_eq!(base.drug_slope_min.to_bits(), shifted.drug_slope_min.to_bits());
        assert_eq!(base.drug_slope_min_time, 16.0);
        assert_eq!(shifted.drug_slope_min_time, 31.0);
        assert_eq!(shifted.local_slopes.values, base.local_slopes.values);
        assert_eq!(shifted.local_slopes.times[0], base.local_slopes.times[0] + 15.0);
    }

    #[test]
    fn shifted_table_matches_unshifted() {
        let (times, currents) = step_recording();
        let late: Vec<f64> = times.iter().map(|t| t + 100.0).collect();
        let a = detect_slopes(&times, &currents, 5.0, 1.0, &small_config()).unwrap();
        let b = detect_slopes(&late, &currents, 105.0, 1.0, &small_config()).unwrap();
        assert_eq!(a.drug_slope_min, b.drug_slope_min);
        assert_eq!(b.drug_slope_min_time, a.drug_slope_min_time + 100.0);
        assert!((a.baseline_slope - b.baseline_slope).abs() < 1e-9);
    }

    #[test]
    fn untagged_recording_fails_with_missing_marker() {
        let rec = tagged_recording(None);
        assert!(matches!(
            analyze_recording(&rec, &recording_config()),
            Err(AnalysisError::MissingEventMarker { .. })
        ));
    }

    #[test]
    fn rejects_bad_parameters() {
        let (times, currents) = step_recording();
        let cfg = SlopeConfig {
            regression_size: 1,
            ..small_config()
        };
        assert!(matches!(
            detect_slopes(&times, &currents, 5.0, 1.0, &cfg),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(detect_slopes(&times, &currents, 5.0, 0.0, &small_config()).is_err());
        assert!(detect_slopes(&times[..3], &currents, 5.0, 1.0, &small_config()).is_err());
    }

    #[test]
    fn rejects_unordered_times() {
        let (mut times, currents) = step_recording();
        times.swap(3, 4);
        assert!(matches!(
            detect_slopes(&times, &currents, 5.0, 1.0, &small_config()),
            Err(AnalysisError::InvalidParameter(_))
        ));
        times.swap(3, 4);
        times[0] = f64::NAN;
        assert!(matches!(
            detect_slopes(&times, &currents, 5.0, 1.0, &small_config()),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}
