//! Raw scorer output → canonical result.

use std::collections::HashSet;

use crate::types::{CategorySet, ClassificationResult, ScoreDistribution, ScoredCategory};
use crate::{HuginnError, Result};

/// Check scorer output against `categories` and pick the top category.
///
/// The argmax is recomputed over the whole mapping; equal scores resolve to
/// the label the scorer listed first. Output that does not cover exactly
/// `categories` with scores in `[0, 1]` is reported as `ScoringUnavailable`.
pub(crate) fn normalize(
    scored: Vec<ScoredCategory>,
    categories: &CategorySet,
) -> Result<ClassificationResult> {
    if scored.len() != categories.len() {
        return Err(contract(format!(
            "expected {} scores, got {}",
            categories.len(),
            scored.len()
        )));
    }

    let mut seen = HashSet::with_capacity(scored.len());
    for entry in &scored {
        if !categories.contains(&entry.category) {
            return Err(contract(format!("unknown label '{}'", entry.category)));
        }
        if !seen.insert(entry.category.as_str()) {
            return Err(contract(format!("duplicate label '{}'", entry.category)));
        }
        if !(0.0..=1.0).contains(&entry.score) {
            return Err(contract(format!(
                "score {} for '{}' is outside [0, 1]",
                entry.score, entry.category
            )));
        }
    }

    let mut top = &scored[0];
    for entry in &scored[1..] {
        if entry.score > top.score {
            top = entry;
        }
    }
    let (top_category, top_score) = (top.category.clone(), top.score);

    Ok(ClassificationResult {
        top_category,
        top_score,
        scores: scored.into_iter().collect::<ScoreDistribution>(),
    })
}

fn contract(reason: String) -> HuginnError {
    HuginnError::ScoringUnavailable(format!("scorer returned malformed output: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> CategorySet {
        CategorySet::new(["Product Quality", "Delivery Issues", "Others"]).unwrap()
    }

    fn scored(entries: &[(&str, f32)]) -> Vec<ScoredCategory> {
        entries
            .iter()
            .map(|(c, s)| ScoredCategory::new(*c, *s))
            .collect()
    }

    #[test]
    fn picks_highest_score_even_when_not_first() {
        let result = normalize(
            scored(&[("Others", 0.2), ("Product Quality", 0.5), ("Delivery Issues", 0.3)]),
            &set(),
        )
        .unwrap();
        assert_eq!(result.top_category, "Product Quality");
        assert_eq!(result.top_score, 0.5);
    }

    #[test]
    fn ties_go_to_first_listed() {
        let result = normalize(
            scored(&[("Delivery Issues", 0.4), ("Product Quality", 0.4), ("Others", 0.2)]),
            &set(),
        )
        .unwrap();
        assert_eq!(result.top_category, "Delivery Issues");
    }

    #[test]
    fn keeps_scorer_order() {
        let result = normalize(
            scored(&[("Others", 0.1), ("Delivery Issues", 0.6), ("Product Quality", 0.3)]),
            &set(),
        )
        .unwrap();
        assert_eq!(
            result.scores.categories().collect::<Vec<_>>(),
            vec!["Others", "Delivery Issues", "Product Quality"]
        );
    }

    #[test]
    fn rejects_missing_category() {
        let err = normalize(scored(&[("Others", 0.5), ("Product Quality", 0.5)]), &set())
            .unwrap_err();
        assert!(matches!(err, HuginnError::ScoringUnavailable(_)));
    }

    #[test]
    fn rejects_unknown_and_duplicate_labels() {
        let unknown = scored(&[("Others", 0.1), ("Weather", 0.6), ("Product Quality", 0.3)]);
        assert!(normalize(unknown, &set()).is_err());

        let duplicate = scored(&[("Others", 0.1), ("Others", 0.6), ("Product Quality", 0.3)]);
        let err = normalize(duplicate, &set()).unwrap_err();
        assert!(err.to_string().contains("duplicate label 'Others'"));
    }

    #[test]
    fn rejects_out_of_range_and_nan_scores() {
        let high = scored(&[("Others", 1.2), ("Delivery Issues", 0.0), ("Product Quality", 0.0)]);
        assert!(normalize(high, &set()).is_err());

        let nan = scored(&[("Others", f32::NAN), ("Delivery Issues", 0.5), ("Product Quality", 0.5)]);
        assert!(normalize(nan, &set()).is_err());
    }
}
