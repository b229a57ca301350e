use crate::error::{AnalysisError, Result};
use std::path::Path;

/// Parse newline-delimited floating point values, ignoring blank/comment lines.
pub fn parse_f64_series(text: &str) -> std::result::Result<Vec<f64>, String> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .map_err(|_| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        return Err("no numeric samples found".into());
    }
    Ok(out)
}

/// Read a newline-delimited floating point series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|err| AnalysisError::from_io(path, err))?;
    parse_f64_series(&text).map_err(|reason| AnalysisError::unreadable(path, reason))
}
