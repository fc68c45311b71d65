//! Prediction tables and the standalone HTML report.

use log::info;
use serde::Serialize;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::explainer::Explanation;
use crate::personality::{is_present, Trait, TraitMap};
use crate::render::escape;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionRow {
    #[serde(rename = "trait")]
    pub trait_: Trait,
    pub present: bool,
    /// Probability as a whole percentage, ties to even.
    pub percent: u32,
}

impl PredictionRow {
    pub fn new(trait_: Trait, probability: f32) -> Self {
        Self {
            trait_,
            present: is_present(probability),
            percent: (probability.clamp(0.0, 1.0) * 100.0).round_ties_even() as u32,
        }
    }

    pub fn verdict(&self) -> &'static str {
        if self.present {
            "YES"
        } else {
            "NO"
        }
    }
}

pub fn prediction_rows(predictions: &TraitMap<f32>) -> Vec<PredictionRow> {
    predictions
        .iter()
        .map(|(t, &p)| PredictionRow::new(t, p))
        .collect()
}

/// Plain-text table with one column per trait.
pub fn prediction_table(predictions: &TraitMap<f32>) -> String {
    let rows = prediction_rows(predictions);
    let label_width = "Predicted Traits".len();
    let widths: Vec<usize> = rows.iter().map(|r| r.trait_.name().len()).collect();

    let mut table = String::new();
    let _ = write!(table, "{:<label_width$}", "");
    for (row, width) in rows.iter().zip(&widths) {
        let _ = write!(table, " | {:>width$}", row.trait_.name());
    }
    table.push('\n');
    let _ = write!(table, "{:<label_width$}", "Predicted Traits");
    for (row, width) in rows.iter().zip(&widths) {
        let _ = write!(table, " | {:>width$}", row.verdict());
    }
    table.push('\n');
    let _ = write!(table, "{:<label_width$}", "Probability");
    for (row, width) in rows.iter().zip(&widths) {
        let _ = write!(table, " | {:>width$}", format!("{}%", row.percent));
    }
    table.push('\n');
    table
}

/// Standalone HTML document: input text, prediction table and one highlighted
/// explanation per trait in `traits` order.
pub fn html_page(explanation: &Explanation, traits: &[Trait]) -> String {
    let rows = prediction_rows(&explanation.predictions);
    let rendered = explanation.rendered();

    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Text to Personality Explainer</title>\n</head>\n<body>\n",
    );
    page.push_str("<h1>Text to Personality Explainer</h1>\n");
    let _ = writeln!(page, "<blockquote>{}</blockquote>", escape(&explanation.text));

    page.push_str("<h2>Predicted Traits</h2>\n<table>\n<tr><th></th>");
    for row in &rows {
        let _ = write!(page, "<th>{}</th>", row.trait_.name());
    }
    page.push_str("</tr>\n<tr><th>Predicted Traits</th>");
    for row in &rows {
        let _ = write!(page, "<td>{}</td>", row.verdict());
    }
    page.push_str("</tr>\n<tr><th>Probability</th>");
    for row in &rows {
        let _ = write!(page, "<td>{}%</td>", row.percent);
    }
    page.push_str("</tr>\n</table>\n");

    page.push_str("<h2>Explanation</h2>\n");
    for &t in traits {
        let _ = writeln!(
            page,
            "<section id=\"{}\">\n<h3>{}</h3>\n<p>{}</p>\n</section>",
            t.code(),
            t.name(),
            rendered.get(t)
        );
    }
    page.push_str("</body>\n</html>\n");
    page
}

/// Writes one HTML report per explanation into a directory as
/// `explanation-1.html`, `explanation-2.html`, ...
#[derive(Debug)]
pub struct ReportDir {
    dir: PathBuf,
    written: usize,
}

impl ReportDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the page, creating the directory on first use, and returns its path.
    pub fn write(&mut self, explanation: &Explanation, traits: &[Trait]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("explanation-{}.html", self.written + 1));
        fs::write(&path, html_page(explanation, traits))?;
        self.written += 1;
        info!("wrote {}", path.display());
        Ok(path)
    }
}
