//! Fixed category weights and category-tag normalization.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::allocation::Category;
use crate::error::{Error, Result};

/// Street types recognized by the street-network preset, in priority order.
pub const STREET_TYPES: [&str; 7] = [
    "residential",
    "pedestrian",
    "living_street",
    "tertiary",
    "secondary",
    "primary",
    "unclassified",
];

/// Share of households placed on each of [`STREET_TYPES`].
pub const STREET_WEIGHTS: [f64; 7] = [0.55, 0.18, 0.18, 0.03, 0.02, 0.02, 0.02];

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Ordered `(category, weight)` pairs summing to 1.0.
///
/// The order doubles as the priority used by [`CategoryWeights::canonical_index`]
/// when a feature carries several category tags.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryWeights {
    entries: Vec<(Category, f64)>,
}

impl CategoryWeights {
    /// Build and validate a weight table.
    pub fn new<I, C>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (C, f64)>,
        C: Into<Category>,
    {
        let weights = Self {
            entries: entries.into_iter().map(|(c, w)| (c.into(), w)).collect(),
        };
        weights.validate()?;
        Ok(weights)
    }

    /// The seven street types with their fixed household shares.
    pub fn street_network() -> Self {
        Self {
            entries: STREET_TYPES
                .iter()
                .zip(STREET_WEIGHTS)
                .map(|(c, w)| ((*c).to_owned(), w))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::InvalidConfig(
                "category weights must not be empty".into(),
            ));
        }
        for (i, (category, weight)) in self.entries.iter().enumerate() {
            if category.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "category name at position {i} is empty"
                )));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "weight {weight} for category '{category}' must be finite and >= 0"
                )));
            }
            if self.entries[..i].iter().any(|(c, _)| c == category) {
                return Err(Error::InvalidConfig(format!(
                    "category '{category}' listed twice"
                )));
            }
        }
        let sum: f64 = self.entries.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidConfig(format!(
                "category weights sum to {sum}, expected 1.0"
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, w)| *w).collect()
    }

    pub fn category(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(c, _)| c.as_str())
    }

    pub fn position(&self, category: &str) -> Option<usize> {
        self.entries.iter().position(|(c, _)| c == category)
    }

    /// Reduce a raw, possibly multi-valued tag cell to one known category.
    ///
    /// The first category in weight order that appears among the tags wins.
    /// Returns `None` when no tag names a known category.
    pub fn canonical_index(&self, raw: &str) -> Option<usize> {
        let tags = split_tags(raw);
        self.entries
            .iter()
            .position(|(c, _)| tags.iter().any(|t| t == c))
    }

    pub fn canonical_category(&self, raw: &str) -> Option<&str> {
        self.canonical_index(raw).and_then(|i| self.category(i))
    }
}

/// Split a tag cell such as `"['residential', 'service']"` into its values.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.chars()
        .filter(|c| !matches!(c, '\'' | '"' | '[' | ']') && !c.is_whitespace())
        .collect::<String>()
        .split(',')
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}
