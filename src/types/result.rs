//! Classification result types.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One category paired with its score, as returned by a scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCategory {
    pub category: String,
    pub score: f32,
}

impl ScoredCategory {
    pub fn new(category: impl Into<String>, score: f32) -> Self {
        Self {
            category: category.into(),
            score,
        }
    }
}

/// Category → score mapping that keeps the scorer's ordering.
///
/// Serializes as a JSON object whose keys appear in that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreDistribution {
    entries: Vec<ScoredCategory>,
}

impl ScoreDistribution {
    pub fn get(&self, category: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in scorer order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|e| (e.category.as_str(), e.score))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.category.as_str())
    }

    /// Entries sorted by descending score for display. Equal scores keep
    /// their scorer order.
    pub fn ranked(&self) -> Vec<(&str, f32)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl FromIterator<ScoredCategory> for ScoreDistribution {
    fn from_iter<T: IntoIterator<Item = ScoredCategory>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for ScoreDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.category, &entry.score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = ScoreDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category names to scores")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((category, score)) = access.next_entry::<String, f32>()? {
                    entries.push(ScoredCategory { category, score });
                }
                Ok(ScoreDistribution { entries })
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// Canonical result of classifying one text.
///
/// `top_category` is the highest-scoring entry of `scores` (ties go to the
/// entry the scorer ranked first) and `top_score == scores[top_category]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub top_category: String,
    pub top_score: f32,
    #[serde(rename = "all_scores")]
    pub scores: ScoreDistribution,
}

/// Results index-aligned with the input texts.
pub type BatchResult = Vec<ClassificationResult>;
