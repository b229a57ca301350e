use std::path::PathBuf;
use thiserror::Error;

/// Failures that end the analysis of a single record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("recording {record} has no tag to anchor the baseline and drug windows")]
    MissingEventMarker { record: String },
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("degenerate regression: {0}")]
    DegenerateRegression(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("cannot read {}: {reason}", path.display())]
    InputUnreadable { path: PathBuf, reason: String },
}

impl AnalysisError {
    pub(crate) fn unreadable(path: &std::path::Path, reason: impl ToString) -> Self {
        AnalysisError::InputUnreadable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Map an IO error to `InputNotFound` or `InputUnreadable`.
    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            AnalysisError::InputNotFound(path.to_path_buf())
        } else {
            Self::unreadable(path, err)
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
