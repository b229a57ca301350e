use crate::error::{AnalysisError, Result};
use crate::report::ReportRow;
use crate::signal::TimeSeries;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SweepRow {
    time_min: f64,
    current_pa: f64,
}

/// Read a `time_min,current_pa` table of per-sweep holding currents.
pub fn read_sweep_table(path: &Path) -> Result<TimeSeries> {
    let file = std::fs::File::open(path).map_err(|err| AnalysisError::from_io(path, err))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut times = Vec::new();
    let mut currents = Vec::new();
    for (idx, row) in rdr.deserialize::<SweepRow>().enumerate() {
        let row =
            row.map_err(|err| AnalysisError::unreadable(path, format!("row {}: {err}", idx + 1)))?;
        times.push(row.time_min);
        currents.push(row.current_pa);
    }
    if times.is_empty() {
        return Err(AnalysisError::unreadable(path, "no rows"));
    }
    TimeSeries::new(times, currents).map_err(|err| AnalysisError::unreadable(path, err))
}

/// Write one row per analysed record.
pub fn write_results_csv(path: &Path, rows: &[ReportRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
