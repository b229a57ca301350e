use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ihs_lib::{
    batch::analyze_batch,
    config::{read_config, AnalysisConfig},
    io::{
        csv::{read_sweep_table, write_results_csv},
        recording::{load_recording, write_recording},
        text::read_f64_series,
    },
    imaging::{baseline_frame, delta_f_over_f, Frame},
    plot::{DiagnosticPlot, Figure, Marker, PlotBackend, Series},
    recording::Recording,
    report::{safe_name, ReportPage, ReportRow, IMAGE_DIR},
    responder::{classify, identify_by_slope, ResponseClass, DEFAULT_THRESHOLD},
    slope::{analyze_recording_with_trace, detect_slopes},
    stats::{descriptive_stats, paired_t_test, Descriptive, TTest},
    synthetic::{simulate_recording, SyntheticSpec},
};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "ihs",
    version,
    about = "IHS: holding-current slope analysis for voltage-clamp recordings"
)]
struct Cli {
    /// Log filter (e.g. `debug`, `ihs_lib=trace`); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure baseline and drug slopes of one JSON recording
    Slopes {
        #[arg(long)]
        recording: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Render the diagnostic figure to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Measure slopes from a `time_min,current_pa` table of sweep means
    TableSlopes {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        event_min: f64,
        #[arg(long)]
        sweep_period_min: f64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Analyse a group of recordings into an HTML report
    Report {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also render one diagnostic PNG per recording
        #[arg(long)]
        plots: bool,
        #[arg(required = true)]
        recordings: Vec<PathBuf>,
    },
    /// Classify a baseline/drug slope pair
    Classify {
        #[arg(long, allow_hyphen_values = true)]
        baseline: f64,
        #[arg(long, allow_hyphen_values = true)]
        drug: f64,
        #[arg(long, allow_hyphen_values = true, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },
    /// Paired t-test between two newline-delimited series
    Ttest {
        #[arg(long)]
        a: PathBuf,
        #[arg(long)]
        b: PathBuf,
    },
    /// Write a seeded synthetic recording
    Simulate {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 100)]
        sweeps: usize,
        #[arg(long, default_value_t = 8.0)]
        tag_min: f64,
        #[arg(long, allow_hyphen_values = true, default_value_t = -5.0)]
        drug_slope: f64,
        /// Leave the drug onset unannotated
        #[arg(long)]
        no_tag: bool,
    },
    /// Render ΔF/F heatmaps for a directory of PNG frames
    Dff {
        #[arg(long)]
        frames: PathBuf,
        /// Baseline frame indices as `A..B` (end exclusive)
        #[arg(long, value_parser = parse_frame_range)]
        baseline: Range<usize>,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    match cli.command {
        Commands::Slopes {
            recording,
            config,
            plot,
        } => cmd_slopes(&recording, config.as_deref(), plot.as_deref())?,
        Commands::TableSlopes {
            input,
            event_min,
            sweep_period_min,
            config,
        } => cmd_table_slopes(&input, event_min, sweep_period_min, config.as_deref())?,
        Commands::Report {
            out,
            title,
            config,
            plots,
            recordings,
        } => cmd_report(&out, &title, config.as_deref(), plots, &recordings)?,
        Commands::Classify {
            baseline,
            drug,
            threshold,
        } => cmd_classify(baseline, drug, threshold)?,
        Commands::Ttest { a, b } => cmd_ttest(&a, &b)?,
        Commands::Simulate {
            out,
            seed,
            sweeps,
            tag_min,
            drug_slope,
            no_tag,
        } => cmd_simulate(&out, seed, sweeps, tag_min, drug_slope, no_tag)?,
        Commands::Dff {
            frames,
            baseline,
            out,
        } => cmd_dff(&frames, baseline, &out)?,
    }
    Ok(())
}

fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            read_config(path).with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn cmd_slopes(path: &Path, config: Option<&Path>, plot: Option<&Path>) -> Result<()> {
    let cfg = load_config(config)?;
    let rec = load_recording(path)?;
    let (trace, analysis) = analyze_recording_with_trace(&rec, &cfg)
        .with_context(|| format!("analysing {}", path.display()))?;
    if let Some(out) = plot {
        let figure = DiagnosticPlot::from_analysis(rec.id(), &trace, &analysis);
        draw_diagnostic_png(out, &figure)?;
    }
    let row = ReportRow::new(rec.id(), &analysis, cfg.responder_threshold);
    println!("{}", serde_json::to_string(&row)?);
    Ok(())
}

fn cmd_table_slopes(
    input: &Path,
    event_min: f64,
    sweep_period_min: f64,
    config: Option<&Path>,
) -> Result<()> {
    let cfg = load_config(config)?;
    let table = read_sweep_table(input)?;
    let analysis = detect_slopes(
        &table.times,
        &table.values,
        event_min,
        sweep_period_min,
        &cfg.slope,
    )
    .with_context(|| format!("analysing {}", input.display()))?;
    let id = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let row = ReportRow::new(id, &analysis, cfg.responder_threshold);
    println!("{}", serde_json::to_string(&row)?);
    Ok(())
}

fn cmd_report(
    out: &Path,
    title: &str,
    config: Option<&Path>,
    plots: bool,
    recordings: &[PathBuf],
) -> Result<()> {
    let cfg = load_config(config)?;
    let sources: Vec<String> = recordings
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect();
    let outcome = analyze_batch(&sources, |source| load_recording(Path::new(source)), &cfg);

    let mut page = ReportPage::new(title);
    page.add_title(title);
    for record in &outcome.records {
        page.add_record(&record.row);
        page.add_code(&format!("path: {}", record.source));
        if plots {
            let name = page.next_image_name();
            let png = out.join(IMAGE_DIR).join(&name);
            let figure = DiagnosticPlot::from_analysis(
                &record.row.record_id,
                &record.trace,
                &record.analysis,
            );
            match std::fs::create_dir_all(out.join(IMAGE_DIR))
                .map_err(anyhow::Error::from)
                .and_then(|_| draw_diagnostic_png(&png, &figure))
            {
                Ok(()) => page.add_image(&format!("{IMAGE_DIR}/{name}")),
                Err(err) => log::warn!("Skipping PNG render ({}): {}", png.display(), err),
            }
        }
        page.add_hr();
    }
    for failure in &outcome.failures {
        page.add_failure(failure);
        page.add_hr();
    }

    let rows = outcome.rows();
    page.add_table(&rows);
    let ids: Vec<String> = rows.iter().map(|row| row.record_id.clone()).collect();
    let drug: Vec<f64> = rows.iter().map(|row| row.drug_slope).collect();
    let baseline: Vec<f64> = rows.iter().map(|row| row.baseline_slope).collect();
    let summary = identify_by_slope(&ids, &drug, &baseline, cfg.responder_threshold)?;
    page.add_code(&format!(
        "responders: {} of {} ({}%), failed: {}",
        summary.responders.len(),
        rows.len(),
        summary.response_rate,
        outcome.failures.len()
    ));

    let path = page.save(out)?;
    write_results_csv(&out.join(format!("{}.csv", safe_name(title))), &rows)?;
    println!("{}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct ClassifyOutput {
    delta: f64,
    response: ResponseClass,
}

fn cmd_classify(baseline: f64, drug: f64, threshold: f64) -> Result<()> {
    let out = ClassifyOutput {
        delta: drug - baseline,
        response: classify(baseline, drug, threshold),
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

#[derive(Serialize)]
struct TTestOutput {
    #[serde(flatten)]
    test: TTest,
    a: Descriptive,
    b: Descriptive,
}

fn cmd_ttest(a: &Path, b: &Path) -> Result<()> {
    let a = read_f64_series(a)?;
    let b = read_f64_series(b)?;
    let out = TTestOutput {
        test: paired_t_test(&a, &b)?,
        a: descriptive_stats(&a)?,
        b: descriptive_stats(&b)?,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_simulate(
    out: &Path,
    seed: u64,
    sweeps: usize,
    tag_min: f64,
    drug_slope: f64,
    no_tag: bool,
) -> Result<()> {
    let spec = SyntheticSpec {
        id: out
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "synthetic".into()),
        sweeps,
        tag_min,
        tagged: !no_tag,
        drug_slope_pa_per_min: drug_slope,
        seed,
        ..SyntheticSpec::default()
    };
    let rec = simulate_recording(&spec)?;
    write_recording(out, &rec)?;
    log::info!(
        "simulated {} sweeps of {} into {}",
        rec.sweep_count(),
        rec.id(),
        out.display()
    );
    Ok(())
}

fn parse_frame_range(text: &str) -> std::result::Result<Range<usize>, String> {
    let (start, end) = text
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got {text:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|err| format!("bad frame index {part:?}: {err}"))
    };
    let range = parse(start)?..parse(end)?;
    if range.is_empty() {
        return Err(format!("baseline range {text} is empty"));
    }
    Ok(range)
}

/// PNG frames of `dir` in file-name order, as 16-bit grayscale.
fn load_frames(dir: &Path) -> Result<Vec<(String, Frame)>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading frame directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();
    if paths.is_empty() {
        anyhow::bail!("no PNG frames in {}", dir.display());
    }
    paths
        .iter()
        .map(|path| {
            let luma = image::open(path)
                .with_context(|| format!("decoding frame {}", path.display()))?
                .to_luma16();
            let (width, height) = luma.dimensions();
            let pixels = luma.into_raw().into_iter().map(f64::from).collect();
            let frame = Frame::new(width as usize, height as usize, pixels)?;
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok::<_, anyhow::Error>((name, frame))
        })
        .collect()
}

#[derive(Serialize)]
struct DffOutput {
    frames: usize,
    width: usize,
    height: usize,
    baseline: [usize; 2],
    images: Vec<PathBuf>,
    mean_dff: Vec<f64>,
}

fn cmd_dff(dir: &Path, baseline: Range<usize>, out: &Path) -> Result<()> {
    let frames = load_frames(dir)?;
    let stack: Vec<Frame> = frames.iter().map(|(_, frame)| frame.clone()).collect();
    let base = baseline_frame(&stack, baseline.clone())
        .with_context(|| format!("averaging baseline frames of {}", dir.display()))?;
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let mut images = Vec::with_capacity(frames.len());
    let mut mean_dff = Vec::with_capacity(frames.len());
    for (name, frame) in &frames {
        let dff = delta_f_over_f(frame, &base)?;
        let png = out.join(format!("{}_dff.png", safe_name(name)));
        draw_dff_png(&png, &dff)?;
        mean_dff.push(dff.pixels.iter().sum::<f64>() / dff.pixels.len().max(1) as f64);
        images.push(png);
    }
    log::info!(
        "rendered {} ΔF/F frames from {} into {}",
        images.len(),
        dir.display(),
        out.display()
    );
    let summary = DffOutput {
        frames: frames.len(),
        width: base.width,
        height: base.height,
        baseline: [baseline.start, baseline.end],
        images,
        mean_dff,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Diverging map: blue below baseline, white at zero, red above; saturates at ±1.
fn dff_color(value: f64) -> RGBColor {
    let v = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
    let fade = |strength: f64| (255.0 * (1.0 - strength)).round() as u8;
    if v < 0.0 {
        RGBColor(fade(-v), fade(-v), 255)
    } else {
        RGBColor(255, fade(v), fade(v))
    }
}

/// One filled cell per pixel, row 0 at the top; no text so no fonts are needed.
fn draw_dff_png(path: &Path, frame: &Frame) -> Result<()> {
    let scale = (512 / frame.width.max(frame.height).max(1)).max(1) as u32;
    let size = (frame.width as u32 * scale, frame.height as u32 * scale);
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let (w, h) = (frame.width as f64, frame.height as f64);
    let mut chart = ChartBuilder::on(&root).build_cartesian_2d(0.0..w, 0.0..h)?;
    chart.draw_series(frame.pixels.iter().enumerate().map(|(i, value)| {
        let x = (i % frame.width) as f64;
        let y = h - 1.0 - (i / frame.width) as f64;
        Rectangle::new([(x, y), (x + 1.0, y + 1.0)], dff_color(*value).filled())
    }))?;
    root.present()?;
    Ok(())
}

struct BitmapPanel<'a, 'b> {
    area: &'a DrawingArea<BitMapBackend<'b>, Shift>,
}

impl PlotBackend for BitmapPanel<'_, '_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        draw_plotters_figure(self.area, fig)
    }
}

fn draw_diagnostic_png(path: &Path, plot: &DiagnosticPlot) -> Result<()> {
    let root = BitMapBackend::new(path, (900, 720)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));
    for (area, fig) in panels.iter().zip(plot.figures()) {
        BitmapPanel { area }.draw(fig)?;
    }
    root.present()?;
    Ok(())
}

fn rgb(color: ihs_lib::plot::Color) -> RGBColor {
    let (r, g, b) = color.rgb();
    RGBColor(r, g, b)
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

fn draw_plotters_figure(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    fig: &Figure,
) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    let (x_min, x_max) = padded(x_min, x_max);
    let (y_min, y_max) = padded(y_min, y_max);
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 20),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for marker in &fig.markers {
        match marker {
            Marker::VSpan { from, to, color } => {
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(*from, y_min), (*to, y_max)],
                    rgb(*color).mix(0.6).filled(),
                )))?;
            }
            Marker::VLine { x, color } => {
                chart.draw_series(LineSeries::new(
                    vec![(*x, y_min), (*x, y_max)],
                    &rgb(*color),
                ))?;
            }
            Marker::HLine { y, color } => {
                chart.draw_series(LineSeries::new(
                    vec![(x_min, *y), (x_max, *y)],
                    &rgb(*color),
                ))?;
            }
        }
    }
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                chart.draw_series(LineSeries::new(
                    line.points
                        .iter()
                        .filter(|p| p[0].is_finite() && p[1].is_finite())
                        .map(|p| (p[0], p[1])),
                    rgb(line.style.color).stroke_width(line.style.width.round().max(1.0) as u32),
                ))?;
            }
            Series::Scatter(dots) => {
                let size = dots.style.width.round().max(1.0) as u32 + 1;
                chart.draw_series(
                    dots.points
                        .iter()
                        .filter(|p| p[0].is_finite() && p[1].is_finite())
                        .map(|p| Circle::new((p[0], p[1]), size, rgb(dots.style.color).filled())),
                )?;
            }
        }
    }
    Ok(())
}
