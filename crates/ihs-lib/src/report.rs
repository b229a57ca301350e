//! Single-page HTML reports: one section per record and a summary table.

use crate::{
    batch::BatchFailure,
    responder::{classify, ResponseClass},
    slope::SlopeAnalysis,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (relative to the report) that holds rendered figures.
pub const IMAGE_DIR: &str = "images";

/// One analysed record as it appears in tables and CLI output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub record_id: String,
    pub baseline_slope: f64,
    pub drug_slope: f64,
    pub drug_slope_time_min: f64,
    pub delta: f64,
    pub response: ResponseClass,
}

impl ReportRow {
    pub fn new(record_id: impl Into<String>, analysis: &SlopeAnalysis, threshold: f64) -> Self {
        Self {
            record_id: record_id.into(),
            baseline_slope: analysis.baseline_slope,
            drug_slope: analysis.drug_slope_min,
            drug_slope_time_min: analysis.drug_slope_min_time,
            delta: analysis.delta(),
            response: classify(analysis.baseline_slope, analysis.drug_slope_min, threshold),
        }
    }
}

/// Lowercase letters, keep digits, turn everything else into single `_`.
pub fn safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let mapped = if c.is_alphabetic() {
            c.to_lowercase().next().unwrap_or('_')
        } else if c.is_numeric() {
            c
        } else {
            '_'
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    out.trim_matches('_').to_string()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct ReportPage {
    title: String,
    safe_title: String,
    image_count: usize,
    body: Vec<String>,
}

impl ReportPage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            safe_title: safe_name(title),
            image_count: 0,
            body: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn file_name(&self) -> String {
        format!("{}.html", self.safe_title)
    }

    /// Raw HTML, inserted verbatim.
    pub fn add_html(&mut self, html: &str) {
        self.body.push(html.to_string());
    }

    pub fn add_hr(&mut self) {
        self.body.push("<hr>".into());
    }

    pub fn add_code(&mut self, code: &str) {
        self.body
            .push(format!("<div><code>{}</code></div>", escape_html(code)));
    }

    pub fn add_heading(&mut self, text: &str) {
        self.body.push(format!("<h1>{}</h1>", escape_html(text)));
    }

    pub fn add_title(&mut self, text: &str) {
        self.body.push(format!(
            "<h1 style='text-align: center; font-size: 300%;'>{}</h1><hr>",
            escape_html(text)
        ));
    }

    /// Reserve the file name of the next figure, `<safe title>_<n>.png`.
    pub fn next_image_name(&mut self) -> String {
        self.image_count += 1;
        format!("{}_{}.png", self.safe_title, self.image_count)
    }

    /// Reference an image by its path relative to the report file.
    pub fn add_image(&mut self, src: &str) {
        self.body
            .push(format!("<div><img src='{}'></div>", escape_html(src)));
    }

    pub fn add_record(&mut self, row: &ReportRow) {
        self.add_heading(&row.record_id);
        self.add_code(&format!("baseline slope: {} pA/min", row.baseline_slope));
        self.add_code(&format!(
            "drug slope: {} pA/min at {} min",
            row.drug_slope, row.drug_slope_time_min
        ));
        self.body.push(format!(
            "<div><code>delta slope: {} pA/min <span class='{}'>{}</span></code></div>",
            row.delta, row.response, row.response
        ));
    }

    pub fn add_failure(&mut self, failure: &BatchFailure) {
        self.add_heading(&failure.source);
        self.body.push(format!(
            "<div class='failed'><code>{}</code></div>",
            escape_html(&failure.error.to_string())
        ));
    }

    pub fn add_table(&mut self, rows: &[ReportRow]) {
        self.add_heading("Table");
        self.body.push(
            "<table>\n<tr><th>record</th><th>baseline (pA/min)</th>\
             <th>drug (pA/min)</th><th>delta (pA/min)</th></tr>"
                .into(),
        );
        for row in rows {
            self.body.push(format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class='{}'>{}</td></tr>",
                escape_html(&row.record_id),
                row.baseline_slope,
                row.drug_slope,
                row.response,
                row.delta
            ));
        }
        self.body.push("</table>".into());
    }

    pub fn render(&self) -> String {
        let mut html = String::from("<html>\n<head>\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        html.push_str("<link rel='stylesheet' href='../style.css'>\n</head>\n<body>\n");
        html.push_str(&self.body.join("\n"));
        html.push_str("\n</body>\n</html>\n");
        html
    }

    /// Write `<safe title>.html` into `out_dir`, creating it as needed.
    pub fn save(&self, out_dir: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating report folder {}", out_dir.display()))?;
        let path = out_dir.join(self.file_name());
        fs::write(&path, self.render())
            .with_context(|| format!("writing report {}", path.display()))?;
        log::info!("wrote: {}", path.display());
        Ok(path)
    }
}
