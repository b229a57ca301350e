use crate::signal::TimeSeries;
use crate::slope::SlopeAnalysis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Scatter(LineSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) | Series::Scatter(line) => &line.points,
        }
    }
}

/// Annotations drawn across the full height or width of a panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Marker {
    /// Shaded x range.
    VSpan { from: f64, to: f64, color: Color },
    VLine { x: f64, color: Color },
    HLine { y: f64, color: Color },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// Data extents `(x_min, x_max, y_min, y_max)` covering series and markers.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut xs: Vec<f64> = Vec::new();
        let mut ys: Vec<f64> = Vec::new();
        for series in &self.series {
            for p in series.points() {
                xs.push(p[0]);
                ys.push(p[1]);
            }
        }
        for marker in &self.markers {
            match marker {
                Marker::VSpan { from, to, .. } => xs.extend([*from, *to]),
                Marker::VLine { x, .. } => xs.push(*x),
                Marker::HLine { y, .. } => ys.push(*y),
            }
        }
        let finite = |v: &Vec<f64>| {
            v.iter()
                .copied()
                .filter(|x| x.is_finite())
                .fold(None, |acc: Option<(f64, f64)>, x| match acc {
                    Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
                    None => Some((x, x)),
                })
        };
        let (x_min, x_max) = finite(&xs)?;
        let (y_min, y_max) = finite(&ys)?;
        Some((x_min, x_max, y_min, y_max))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

const RAW: Color = Color(0x9E9E9E);
const SMOOTHED: Color = Color(0x1F77B4);
const FIT: Color = Color(0xD62728);
const BASELINE_SPAN: Color = Color(0xFFE0B2);
const DRUG_SPAN: Color = Color(0xC8E6C9);
const SLOPES: Color = Color(0x2CA02C);
const EVENT: Color = Color(0x000000);

/// Two stacked panels: holding current with the baseline fit on top, local
/// slopes below, both shaded with the baseline and drug windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticPlot {
    pub title: String,
    pub current: Figure,
    pub slopes: Figure,
}

impl DiagnosticPlot {
    pub fn from_analysis(title: &str, raw: &TimeSeries, analysis: &SlopeAnalysis) -> Self {
        Self::from_analysis_limit(title, raw, analysis, 2048)
    }

    pub fn from_analysis_limit(
        title: &str,
        raw: &TimeSeries,
        analysis: &SlopeAnalysis,
        max_points: usize,
    ) -> Self {
        let windows = |fig: &mut Figure| {
            fig.add_marker(Marker::VSpan {
                from: analysis.baseline_window[0],
                to: analysis.baseline_window[1],
                color: BASELINE_SPAN,
            });
            fig.add_marker(Marker::VSpan {
                from: analysis.drug_window[0],
                to: analysis.drug_window[1],
                color: DRUG_SPAN,
            });
            fig.add_marker(Marker::VLine {
                x: analysis.event_time,
                color: EVENT,
            });
        };

        let mut current =
            Figure::new(Some(title.to_string())).with_labels("time (min)", "current (pA)");
        windows(&mut current);
        current.add_series(Series::Scatter(LineSeries {
            name: "sweep mean".into(),
            points: decimate_points(&raw.points(), max_points),
            style: Style {
                width: 1.0,
                dash: None,
                color: RAW,
            },
        }));
        current.add_series(Series::Line(LineSeries {
            name: "smoothed".into(),
            points: decimate_points(&analysis.smoothed.points(), max_points),
            style: Style {
                width: 2.0,
                dash: None,
                color: SMOOTHED,
            },
        }));
        let fit_at = |t: f64| analysis.baseline_intercept + analysis.baseline_slope * t;
        let [b0, b1] = analysis.baseline_window;
        current.add_series(Series::Line(LineSeries {
            name: "baseline fit".into(),
            points: vec![[b0, fit_at(b0)], [b1, fit_at(b1)]],
            style: Style {
                width: 2.0,
                dash: Some([6.0, 4.0]),
                color: FIT,
            },
        }));

        let mut slopes = Figure::new(Some("local slope".to_string()))
            .with_labels("time (min)", "slope (pA/min)");
        windows(&mut slopes);
        slopes.add_marker(Marker::HLine {
            y: analysis.baseline_slope,
            color: FIT,
        });
        slopes.add_series(Series::Line(LineSeries {
            name: "local slope".into(),
            points: decimate_points(&analysis.local_slopes.points(), max_points),
            style: Style {
                width: 1.5,
                dash: None,
                color: SLOPES,
            },
        }));
        slopes.add_series(Series::Scatter(LineSeries {
            name: "drug minimum".into(),
            points: vec![[analysis.drug_slope_min_time, analysis.drug_slope_min]],
            style: Style {
                width: 4.0,
                dash: None,
                color: FIT,
            },
        }));

        Self {
            title: title.to_string(),
            current,
            slopes,
        }
    }

    pub fn figures(&self) -> [&Figure; 2] {
        [&self.current, &self.slopes]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slope::{detect_slopes, SlopeConfig};

    #[test]
    fn decimation_keeps_short_series() {
        let pts = vec![[0.0, 1.0], [1.0, 2.0]];
        assert_eq!(decimate_points(&pts, 10), pts);
        let long: Vec<[f64; 2]> = (0..100).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&long, 10);
        assert_eq!(out.len(), 10);
        assert_eq!(out[1], [10.0, 0.0]);
    }

    #[test]
    fn bounds_include_markers() {
        let mut fig = Figure::new(None::<String>);
        fig.add_series(Series::Line(LineSeries {
            name: "a".into(),
            points: vec![[1.0, 5.0], [2.0, f64::NAN], [3.0, -1.0]],
            style: Style {
                width: 1.0,
                dash: None,
                color: Color(0),
            },
        }));
        fig.add_marker(Marker::VSpan {
            from: -2.0,
            to: 0.0,
            color: Color(0),
        });
        fig.add_marker(Marker::HLine {
            y: 10.0,
            color: Color(0),
        });
        assert_eq!(fig.bounds(), Some((-2.0, 3.0, -1.0, 10.0)));
        assert_eq!(Figure::new(None::<String>).bounds(), None);
    }

    #[test]
    fn diagnostic_plot_shades_both_windows() {
        let mut currents = vec![100.0; 12];
        currents.extend((1..=8).map(|i| 100.0 - 10.0 * i as f64));
        let times: Vec<f64> = (0..currents.len()).map(|i| i as f64).collect();
        let cfg = SlopeConfig {
            filter_size: 1,
            regression_size: 3,
            ..SlopeConfig::default()
        };
        let analysis = detect_slopes(&times, &currents, 11.0, 1.0, &cfg).unwrap();
        let raw = TimeSeries::new(times, currents).unwrap();
        let plot = DiagnosticPlot::from_analysis("cell 1", &raw, &analysis);
        for fig in plot.figures() {
            let spans = fig
                .markers
                .iter()
                .filter(|m| matches!(m, Marker::VSpan { .. }))
                .count();
            assert_eq!(spans, 2);
        }
        assert_eq!(plot.current.series.len(), 3);
        assert_eq!(plot.current.series[0].points().len(), raw.len());
        let minimum = plot.slopes.series[1].points()[0];
        assert_eq!(minimum, [analysis.drug_slope_min_time, analysis.drug_slope_min]);
        assert_eq!(plot.current.title.as_deref(), Some("cell 1"));
    }

    #[test]
    fn color_components() {
        assert_eq!(Color(0x1F77B4).rgb(), (0x1F, 0x77, 0xB4));
    }
}
