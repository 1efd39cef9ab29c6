//! Terminal rendering for the `huginn` CLI.

use std::fmt::Write;

use crate::HuginnError;
use crate::types::ClassificationResult;

/// Characters of a review shown in result tables.
pub const PREVIEW_CHARS: usize = 100;

const BAR_WIDTH: usize = 40;

/// First [`PREVIEW_CHARS`] characters of `review`, with `...` when cut.
pub fn preview(review: &str) -> String {
    match review.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &review[..end]),
        None => review.to_string(),
    }
}

/// One row of the batch results table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub review: String,
    pub category: String,
    pub confidence: f32,
}

/// Batch results prepared for display.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub rows: Vec<ReviewRow>,
    /// Predicted category counts, most frequent first; ties keep first-seen order.
    pub distribution: Vec<(String, usize)>,
}

impl BatchReport {
    pub fn new(reviews: &[String], results: &[ClassificationResult]) -> Self {
        let rows: Vec<ReviewRow> = reviews
            .iter()
            .zip(results)
            .map(|(review, result)| ReviewRow {
                review: preview(review),
                category: result.top_category.clone(),
                confidence: result.top_score,
            })
            .collect();

        let mut distribution: Vec<(String, usize)> = Vec::new();
        for row in &rows {
            match distribution.iter_mut().find(|(c, _)| *c == row.category) {
                Some((_, count)) => *count += 1,
                None => distribution.push((row.category.clone(), 1)),
            }
        }
        distribution.sort_by(|a, b| b.1.cmp(&a.1));

        Self { rows, distribution }
    }
}

/// Results table: review preview, category, confidence.
pub fn render_table(report: &BatchReport) -> String {
    let review_width = report
        .rows
        .iter()
        .map(|r| r.review.chars().count())
        .chain(["review".len()])
        .max()
        .unwrap_or_default();
    let category_width = report
        .rows
        .iter()
        .map(|r| r.category.chars().count())
        .chain(["category".len()])
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<review_width$}  {:<category_width$}  confidence",
        "review", "category"
    );
    let _ = writeln!(
        out,
        "{}  {}  ----------",
        "-".repeat(review_width),
        "-".repeat(category_width)
    );
    for row in &report.rows {
        let _ = writeln!(
            out,
            "{:<review_width$}  {:<category_width$}  {:.2}",
            row.review.replace('\n', " "),
            row.category,
            row.confidence
        );
    }
    out
}

/// Category distribution as a count bar chart.
pub fn render_distribution(report: &BatchReport) -> String {
    let max = report
        .distribution
        .iter()
        .map(|(_, n)| *n)
        .max()
        .unwrap_or_default();
    let label_width = label_width(report.distribution.iter().map(|(c, _)| c.as_str()));

    let mut out = String::from("Distribution of review categories\n");
    for (category, count) in &report.distribution {
        let bar = if max == 0 { 0 } else { count * BAR_WIDTH / max };
        let _ = writeln!(
            out,
            "  {category:<label_width$}  {} {count}",
            "█".repeat(bar.max(1))
        );
    }
    out
}

/// Single-review result: top category, confidence and a score chart sorted
/// by descending score with the top category marked `*`.
pub fn render_scores(result: &ClassificationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Top category: {}", result.top_category);
    let _ = writeln!(out, "Confidence:   {:.2}", result.top_score);
    let _ = writeln!(out);

    let label_width = label_width(result.scores.categories());
    for (category, score) in result.scores.ranked() {
        let marker = if category == result.top_category { '*' } else { ' ' };
        let bar = (score.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
        let _ = writeln!(
            out,
            "{marker} {category:<label_width$}  {:<BAR_WIDTH$} {score:.2}",
            "█".repeat(bar)
        );
    }
    out
}

/// User-facing message for a failed batch run.
pub fn render_batch_error(err: &HuginnError) -> String {
    match err {
        HuginnError::InvalidBatchInput(reason) => format!("Error: {reason}"),
        other => format!("Error processing file: {other}"),
    }
}

fn label_width<'a>(labels: impl Iterator<Item = &'a str>) -> usize {
    labels.map(|l| l.chars().count()).max().unwrap_or_default()
}
