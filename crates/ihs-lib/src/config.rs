use crate::{
    error::{AnalysisError, Result},
    responder::DEFAULT_THRESHOLD,
    slope::SlopeConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything needed to go from a recording to a classified slope pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Channel holding the clamp current.
    pub channel: usize,
    /// Start of the per-sweep measurement window (seconds into the sweep).
    pub measure_start_sec: f64,
    /// End of the per-sweep measurement window (seconds into the sweep).
    pub measure_end_sec: f64,
    /// Slope change (pA/min) below which a record counts as responsive.
    pub responder_threshold: f64,
    pub slope: SlopeConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            measure_start_sec: 3.0,
            measure_end_sec: 10.0,
            responder_threshold: DEFAULT_THRESHOLD,
            slope: SlopeConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| AnalysisError::InvalidParameter(err.to_string()))
    }
}

pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let contents = fs::read_to_string(path).map_err(|err| AnalysisError::from_io(path, err))?;
    toml::from_str(&contents).map_err(|err| AnalysisError::unreadable(path, err))
}
