use crate::{
    config::AnalysisConfig,
    error::{AnalysisError, Result},
    recording::Recording,
    report::ReportRow,
    signal::TimeSeries,
    slope::{analyze_recording_with_trace, SlopeAnalysis},
};

/// A record that made it through the whole pipeline.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub source: String,
    pub row: ReportRow,
    pub trace: TimeSeries,
    pub analysis: SlopeAnalysis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub source: String,
    pub error: AnalysisError,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<BatchRecord>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn rows(&self) -> Vec<ReportRow> {
        self.records.iter().map(|record| record.row.clone()).collect()
    }
}

/// Load and analyse every source in order. A failing source is logged and
/// recorded; it never stops the batch.
pub fn analyze_batch<S, R, F>(sources: &[S], mut load: F, cfg: &AnalysisConfig) -> BatchOutcome
where
    S: AsRef<str>,
    R: Recording,
    F: FnMut(&str) -> Result<R>,
{
    let mut outcome = BatchOutcome::default();
    for source in sources {
        let source = source.as_ref();
        let result = load(source).and_then(|rec| {
            let (trace, analysis) = analyze_recording_with_trace(&rec, cfg)?;
            let row = ReportRow::new(rec.id(), &analysis, cfg.responder_threshold);
            Ok((trace, analysis, row))
        });
        match result {
            Ok((trace, analysis, row)) => {
                log::info!(
                    "{}: baseline {:.3} pA/min, drug {:.3} pA/min ({})",
                    row.record_id,
                    row.baseline_slope,
                    row.drug_slope,
                    row.response
                );
                outcome.records.push(BatchRecord {
                    source: source.to_string(),
                    row,
                    trace,
                    analysis,
                });
            }
            Err(error) => {
                log::warn!("skipping {source}: {error}");
                outcome.failures.push(BatchFailure {
                    source: source.to_string(),
                    error,
                });
            }
        }
    }
    outcome
}
