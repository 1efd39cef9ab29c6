//! CSV batch input.
//!
//! Reviews are read from the first column named `review`, or failing that
//! `text`. Header names are matched exactly.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::{HuginnError, Result};

/// Accepted review column headers, in lookup order.
pub const REVIEW_COLUMNS: [&str; 2] = ["review", "text"];

/// Reason reported when no review column exists.
pub const MISSING_REVIEW_COLUMN: &str = "CSV file must have a column named 'review' or 'text'";

/// Index of the review column in `headers`.
pub fn detect_review_column(headers: &StringRecord) -> Result<usize> {
    REVIEW_COLUMNS
        .iter()
        .find_map(|wanted| headers.iter().position(|h| h == *wanted))
        .ok_or_else(|| HuginnError::InvalidBatchInput(MISSING_REVIEW_COLUMN.to_string()))
}

/// Read every review from CSV data with a header row.
///
/// The column is detected before any row is read. Missing cells in short
/// rows read as empty reviews.
pub fn read_reviews<R: Read>(input: R) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let column = detect_review_column(&headers)?;

    let mut reviews = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        reviews.push(row.get(column).unwrap_or_default().to_string());
    }
    Ok(reviews)
}

/// Read reviews from a CSV file.
pub fn read_reviews_from_path(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        HuginnError::InvalidBatchInput(format!("cannot open {}: {e}", path.display()))
    })?;
    read_reviews(std::io::BufReader::new(file))
}

fn csv_error(e: csv::Error) -> HuginnError {
    HuginnError::InvalidBatchInput(format!("malformed CSV: {e}"))
}
