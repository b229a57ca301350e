use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slope change (pA/min) below which a cell counts as a responder.
pub const DEFAULT_THRESHOLD: f64 = -1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseClass {
    Responsive,
    NonResponsive,
}

impl ResponseClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseClass::Responsive => "responsive",
            ResponseClass::NonResponsive => "non-responsive",
        }
    }
}

impl fmt::Display for ResponseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Responsive when `drug_slope - baseline_slope < threshold`.
pub fn classify(baseline_slope: f64, drug_slope: f64, threshold: f64) -> ResponseClass {
    if drug_slope - baseline_slope < threshold {
        ResponseClass::Responsive
    } else {
        ResponseClass::NonResponsive
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponderSummary {
    pub responders: Vec<String>,
    pub non_responders: Vec<String>,
    /// Percentage of responders, rounded to 3 decimals.
    pub response_rate: f64,
}

/// Split record ids into responders and non-responders by slope change.
pub fn identify_by_slope(
    ids: &[String],
    drug_slopes: &[f64],
    baseline_slopes: &[f64],
    threshold: f64,
) -> Result<ResponderSummary> {
    if ids.len() != drug_slopes.len() || ids.len() != baseline_slopes.len() {
        return Err(AnalysisError::InvalidParameter(format!(
            "{} ids, {} drug slopes, {} baseline slopes",
            ids.len(),
            drug_slopes.len(),
            baseline_slopes.len()
        )));
    }
    let mut responders = Vec::new();
    let mut non_responders = Vec::new();
    for ((id, &drug), &baseline) in ids.iter().zip(drug_slopes).zip(baseline_slopes) {
        match classify(baseline, drug, threshold) {
            ResponseClass::Responsive => responders.push(id.clone()),
            ResponseClass::NonResponsive => non_responders.push(id.clone()),
        }
    }
    let response_rate = if ids.is_empty() {
        0.0
    } else {
        (responders.len() as f64 / ids.len() as f64 * 100_000.0).round() / 1000.0
    };
    Ok(ResponderSummary {
        responders,
        non_responders,
        response_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_drop_is_responsive() {
        assert_eq!(classify(0.2, -2.0, -1.5), ResponseClass::Responsive);
    }

    #[test]
    fn weak_drop_is_non_responsive() {
        assert_eq!(classify(0.0, -1.0, -1.5), ResponseClass::NonResponsive);
        // equal to the threshold is not below it
        assert_eq!(classify(0.0, -1.5, -1.5), ResponseClass::NonResponsive);
    }

    #[test]
    fn serializes_kebab_case() {
        let js = serde_json::to_string(&ResponseClass::NonResponsive).unwrap();
        assert_eq!(js, "\"non-responsive\"");
        assert_eq!(ResponseClass::Responsive.to_string(), "responsive");
    }

    #[test]
    fn groups_ids_and_rate() {
        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let summary = identify_by_slope(&ids, &[-3.0, 0.5, -2.0], &[0.0, 0.0, 0.0], -1.5).unwrap();
        assert_eq!(summary.responders, vec!["a", "c"]);
        assert_eq!(summary.non_responders, vec!["b"]);
        assert_eq!(summary.response_rate, 66.667);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let ids = vec!["a".to_string()];
        assert!(identify_by_slope(&ids, &[], &[0.0], -1.5).is_err());
    }
}
