//! Seeded synthetic whole-cell recordings for demos and tests.

use crate::{
    error::{AnalysisError, Result},
    recording::{Channel, InMemoryRecording, Tag},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSpec {
    pub id: String,
    pub sweeps: usize,
    pub sweep_length_sec: f64,
    pub data_rate: f64,
    /// Resting holding current (pA).
    pub holding_pa: f64,
    /// Slow drift present for the whole recording (pA/min).
    pub drift_pa_per_min: f64,
    /// Drug onset (minutes); the response starts here even when untagged.
    pub tag_min: f64,
    /// Whether the onset is annotated with a tag.
    pub tagged: bool,
    /// Rate of the drug response (pA/min).
    pub drug_slope_pa_per_min: f64,
    pub drug_duration_min: f64,
    /// Standard deviation of per-sample noise (pA).
    pub noise_pa: f64,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            id: "synthetic".into(),
            sweeps: 100,
            sweep_length_sec: 12.0,
            data_rate: 20.0,
            holding_pa: -50.0,
            drift_pa_per_min: 0.0,
            tag_min: 8.0,
            tagged: true,
            drug_slope_pa_per_min: -5.0,
            drug_duration_min: 6.0,
            noise_pa: 2.0,
            seed: 0,
        }
    }
}

impl SyntheticSpec {
    /// Noise-free current at `t_min` minutes.
    pub fn expected_current(&self, t_min: f64) -> f64 {
        let drug_time = (t_min - self.tag_min).clamp(0.0, self.drug_duration_min.max(0.0));
        self.holding_pa + self.drift_pa_per_min * t_min + self.drug_slope_pa_per_min * drug_time
    }
}

// Sum of four uniforms, scaled to unit variance.
fn gaussian_ish(rng: &mut StdRng) -> f64 {
    let sum: f64 = (0..4).map(|_| rng.gen_range(-1.0f64..1.0)).sum();
    sum / (4.0f64 / 3.0).sqrt()
}

pub fn simulate_recording(spec: &SyntheticSpec) -> Result<InMemoryRecording> {
    if spec.sweeps == 0 {
        return Err(AnalysisError::InvalidParameter(
            "synthetic recording needs at least one sweep".into(),
        ));
    }
    if !(spec.data_rate.is_finite() && spec.data_rate > 0.0)
        || !(spec.sweep_length_sec.is_finite() && spec.sweep_length_sec > 0.0)
    {
        return Err(AnalysisError::InvalidParameter(format!(
            "data rate {} Hz and sweep length {} s must be positive",
            spec.data_rate, spec.sweep_length_sec
        )));
    }
    let samples = (spec.data_rate * spec.sweep_length_sec).round() as usize;
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let sweeps = (0..spec.sweeps)
        .map(|sweep| {
            let start_sec = sweep as f64 * spec.sweep_length_sec;
            (0..samples)
                .map(|i| {
                    let t_min = (start_sec + i as f64 / spec.data_rate) / 60.0;
                    spec.expected_current(t_min) + spec.noise_pa * gaussian_ish(&mut rng)
                })
                .collect()
        })
        .collect();
    let tags = if spec.tagged {
        vec![Tag {
            time_min: spec.tag_min,
            comment: "drug".into(),
        }]
    } else {
        Vec::new()
    };
    Ok(InMemoryRecording {
        id: spec.id.clone(),
        data_rate: spec.data_rate,
        channels: vec![Channel {
            name: "Im".into(),
            units: "pA".into(),
            sweeps,
        }],
        sweep_start_sec: None,
        tags,
    })
}
