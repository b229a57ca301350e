//! Sweep-based recordings as seen by the analysis code.
//!
//! File formats stay behind the [`Recording`] trait: every read names the
//! sweep and channel it wants, so there is no "active sweep" cursor.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Operator annotation, e.g. the start of a drug perfusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub time_min: f64,
    #[serde(default)]
    pub comment: String,
}

pub trait Recording {
    fn id(&self) -> &str;
    fn sweep_count(&self) -> usize;
    /// Samples per second.
    fn data_rate(&self) -> f64;
    fn sweep_length_sec(&self) -> f64;
    /// Start time of every sweep, in minutes.
    fn sweep_times_min(&self) -> Vec<f64>;
    /// Samples `samples` of one sweep on one channel; the range is clamped to
    /// the sweep length.
    fn channel_slice(
        &self,
        sweep: usize,
        channel: usize,
        samples: Range<usize>,
    ) -> Result<&[f64]>;
    fn tags(&self) -> &[Tag];

    fn tag_times_min(&self) -> Vec<f64> {
        self.tags().iter().map(|tag| tag.time_min).collect()
    }
}

/// Time of the first tag in minutes.
pub fn first_tag_time(rec: &dyn Recording) -> Result<f64> {
    rec.tags()
        .first()
        .map(|tag| tag.time_min)
        .ok_or_else(|| AnalysisError::MissingEventMarker {
            record: rec.id().to_string(),
        })
}

/// Mean of the samples between `start_sec` and `end_sec` of every sweep.
pub fn mean_by_sweep(
    rec: &dyn Recording,
    channel: usize,
    start_sec: f64,
    end_sec: f64,
) -> Result<Vec<f64>> {
    if start_sec.is_nan() || end_sec.is_nan() || start_sec < 0.0 || end_sec <= start_sec {
        return Err(AnalysisError::InvalidParameter(format!(
            "measurement window {start_sec}..{end_sec} s is not a forward range"
        )));
    }
    let first = (rec.data_rate() * start_sec) as usize;
    let last = (rec.data_rate() * end_sec) as usize;
    (0..rec.sweep_count())
        .map(|sweep| {
            let segment = rec.channel_slice(sweep, channel, first..last)?;
            if segment.is_empty() {
                return Err(AnalysisError::InsufficientData(format!(
                    "sweep {sweep} of {} has no samples between {start_sec} s and {end_sec} s",
                    rec.id()
                )));
            }
            Ok(segment.iter().sum::<f64>() / segment.len() as f64)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub units: String,
    /// One sample vector per sweep.
    pub sweeps: Vec<Vec<f64>>,
}

/// A fully loaded recording; also the JSON interchange format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InMemoryRecording {
    pub id: String,
    pub data_rate: f64,
    pub channels: Vec<Channel>,
    /// Explicit sweep start times (seconds); back-to-back sweeps when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_start_sec: Option<Vec<f64>>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl InMemoryRecording {
    /// Check the shape invariants the accessors rely on.
    pub fn validate(&self) -> Result<()> {
        if !self.data_rate.is_finite() || self.data_rate <= 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "{}: data rate must be positive, got {}",
                self.id, self.data_rate
            )));
        }
        let Some(reference) = self.channels.first() else {
            return Err(AnalysisError::InvalidParameter(format!(
                "{}: recording has no channels",
                self.id
            )));
        };
        let sweeps = reference.sweeps.len();
        let samples = reference.sweeps.first().map_or(0, Vec::len);
        for channel in &self.channels {
            if channel.sweeps.len() != sweeps {
                return Err(AnalysisError::InvalidParameter(format!(
                    "{}: channel {} has {} sweeps, expected {}",
                    self.id,
                    channel.name,
                    channel.sweeps.len(),
                    sweeps
                )));
            }
            if let Some(idx) = channel.sweeps.iter().position(|s| s.len() != samples) {
                return Err(AnalysisError::InvalidParameter(format!(
                    "{}: sweep {} of channel {} has {} samples, expected {}",
                    self.id,
                    idx,
                    channel.name,
                    channel.sweeps[idx].len(),
                    samples
                )));
            }
        }
        if let Some(starts) = &self.sweep_start_sec {
            if starts.len() != sweeps {
                return Err(AnalysisError::InvalidParameter(format!(
                    "{}: {} sweep start times for {} sweeps",
                    self.id,
                    starts.len(),
                    sweeps
                )));
            }
            if starts.iter().any(|t| !t.is_finite()) || starts.windows(2).any(|w| w[1] <= w[0]) {
                return Err(AnalysisError::InvalidParameter(format!(
                    "{}: sweep start times must be finite and increasing",
                    self.id
                )));
            }
        }
        if let Some(tag) = self.tags.iter().find(|tag| !tag.time_min.is_finite()) {
            return Err(AnalysisError::InvalidParameter(format!(
                "{}: tag {:?} has time {}",
                self.id, tag.comment, tag.time_min
            )));
        }
        Ok(())
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels
            .iter()
            .position(|channel| channel.name.eq_ignore_ascii_case(name))
    }
}

impl Recording for InMemoryRecording {
    fn id(&self) -> &str {
        &self.id
    }

    fn sweep_count(&self) -> usize {
        self.channels.first().map_or(0, |c| c.sweeps.len())
    }

    fn data_rate(&self) -> f64 {
        self.data_rate
    }

    fn sweep_length_sec(&self) -> f64 {
        let samples = self
            .channels
            .first()
            .and_then(|c| c.sweeps.first())
            .map_or(0, Vec::len);
        samples as f64 / self.data_rate
    }

    fn sweep_times_min(&self) -> Vec<f64> {
        match &self.sweep_start_sec {
            Some(starts) => starts.iter().map(|s| s / 60.0).collect(),
            None => {
                let length = self.sweep_length_sec();
                (0..self.sweep_count())
                    .map(|i| i as f64 * length / 60.0)
                    .collect()
            }
        }
    }

    fn channel_slice(
        &self,
        sweep: usize,
        channel: usize,
        samples: Range<usize>,
    ) -> Result<&[f64]> {
        let data = self
            .channels
            .get(channel)
            .ok_or_else(|| {
                AnalysisError::InvalidParameter(format!(
                    "{} has {} channels; channel {} is out of range",
                    self.id,
                    self.channels.len(),
                    channel
                ))
            })?
            .sweeps
            .get(sweep)
            .ok_or_else(|| {
                AnalysisError::InvalidParameter(format!(
                    "{} has {} sweeps; sweep {} is out of range",
                    self.id,
                    self.sweep_count(),
                    sweep
                ))
            })?;
        let end = samples.end.min(data.len());
        let start = samples.start.min(end);
        Ok(&data[start..end])
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }
}
