use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Row-major grayscale image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<f64>,
}

impl Frame {
    pub fn new(width: usize, height: usize, pixels: Vec<f64>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(AnalysisError::InvalidParameter(format!(
                "{}x{} frame needs {} pixels, got {}",
                width,
                height,
                width * height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    fn same_shape(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Pixel-wise mean of `frames[range]`.
pub fn baseline_frame(frames: &[Frame], range: Range<usize>) -> Result<Frame> {
    let end = range.end.min(frames.len());
    let selected = frames.get(range.start.min(end)..end).unwrap_or(&[]);
    let Some(first) = selected.first() else {
        return Err(AnalysisError::InsufficientData(format!(
            "no frames in baseline range {}..{} of {}",
            range.start,
            range.end,
            frames.len()
        )));
    };
    let mut sum = vec![0.0; first.pixels.len()];
    for frame in selected {
        if !frame.same_shape(first) {
            return Err(AnalysisError::InvalidParameter(format!(
                "frame is {}x{}, baseline is {}x{}",
                frame.width, frame.height, first.width, first.height
            )));
        }
        for (acc, px) in sum.iter_mut().zip(&frame.pixels) {
            *acc += px;
        }
    }
    let n = selected.len() as f64;
    Frame::new(first.width, first.height, sum.into_iter().map(|s| s / n).collect())
}

/// `frame / baseline - 1` per pixel; zero baseline pixels give 0.
pub fn delta_f_over_f(frame: &Frame, baseline: &Frame) -> Result<Frame> {
    if !frame.same_shape(baseline) {
        return Err(AnalysisError::InvalidParameter(format!(
            "frame is {}x{}, baseline is {}x{}",
            frame.width, frame.height, baseline.width, baseline.height
        )));
    }
    let pixels = frame
        .pixels
        .iter()
        .zip(&baseline.pixels)
        .map(|(f, b)| if *b == 0.0 { 0.0 } else { f / b - 1.0 })
        .collect();
    Frame::new(frame.width, frame.height, pixels)
}
