use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::domain::candidate::Category;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Basic,
    Intermediate,
    Advanced,
}

/// Minimum number of validated items wanted per category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryQuota(pub BTreeMap<Category, usize>);

impl CategoryQuota {
    pub fn new(entries: &[(Category, usize)]) -> Self {
        CategoryQuota(
            entries
                .iter()
                .filter(|(_, count)| *count > 0)
                .map(|(category, count)| (*category, *count))
                .collect(),
        )
    }

    pub fn get(&self, category: Category) -> usize {
        self.0.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.keys().copied()
    }
}

/// Numeric knobs derived from a learner profile.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GenerationParameters {
    pub choice_count: usize,
    pub blank_count: usize,
    pub item_count_per_phase: usize,
    pub complexity: ComplexityTier,
    pub max_sentence_words: usize,
    pub quota: CategoryQuota,
}
