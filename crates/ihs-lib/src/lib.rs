//! Holding-current slope analysis for whole-cell voltage-clamp recordings.

pub mod batch;
pub mod config;
pub mod error;
pub mod filters;
pub mod imaging;
pub mod io;
pub mod plot;
pub mod range;
pub mod recording;
pub mod regression;
pub mod report;
pub mod responder;
pub mod signal;
pub mod slope;
pub mod stats;
pub mod synthetic;

pub use error::{AnalysisError, Result};
pub use signal::*;
