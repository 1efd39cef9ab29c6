//! Category set and hypothesis template.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{HuginnError, Result};

/// Issue categories used when no explicit set is configured.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Product Quality",
    "Delivery Issues",
    "Customer Service",
    "Price Concerns",
    "Packaging Issues",
    "Product Expectations",
    "Technical Issues",
    "Others",
];

/// Hypothesis phrasing used when no explicit template is configured.
pub const DEFAULT_HYPOTHESIS_TEMPLATE: &str = "This review is about {}";

/// Ordered, non-empty set of unique category names.
///
/// Fixed at construction; a classification service never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategorySet {
    names: Vec<String>,
}

impl CategorySet {
    /// Build a category set, rejecting empty lists, blank names and duplicates.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(HuginnError::InvalidCategories(
                "at least one category is required".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(HuginnError::InvalidCategories(
                    "category names must not be blank".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(HuginnError::InvalidCategories(format!(
                    "duplicate category '{name}'"
                )));
            }
        }

        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed set; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Borrowed view in set order, as passed to scorers.
    pub fn as_strs(&self) -> Vec<&str> {
        self.iter().collect()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            names: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for CategorySet {
    type Error = HuginnError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<CategorySet> for Vec<String> {
    fn from(set: CategorySet) -> Self {
        set.names
    }
}

/// Format string phrasing a category as a natural-language hypothesis.
///
/// Contains exactly one `{}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HypothesisTemplate(String);

impl HypothesisTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        match template.matches("{}").count() {
            1 => Ok(Self(template)),
            n => Err(HuginnError::InvalidTemplate(format!(
                "expected exactly one '{{}}' placeholder in {template:?}, found {n}"
            ))),
        }
    }

    /// Substitute `category` into the placeholder.
    pub fn render(&self, category: &str) -> String {
        self.0.replacen("{}", category, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HypothesisTemplate {
    fn default() -> Self {
        Self(DEFAULT_HYPOTHESIS_TEMPLATE.to_string())
    }
}

impl fmt::Display for HypothesisTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HypothesisTemplate {
    type Error = HuginnError;

    fn try_from(template: String) -> Result<Self> {
        Self::new(template)
    }
}

impl From<HypothesisTemplate> for String {
    fn from(template: HypothesisTemplate) -> Self {
        template.0
    }
}
