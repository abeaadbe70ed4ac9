use serde::{Deserialize, Serialize};

use crate::models::domain::quality::QualityWarning;

/// Ordered answers with exactly one correct position.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChoiceSet {
    pub choices: Vec<String>,
    pub correct_index: usize,
    #[serde(skip)]
    pub warnings: Vec<QualityWarning>,
}

impl ChoiceSet {
    pub fn correct(&self) -> &str {
        &self.choices[self.correct_index]
    }

    pub fn distractors(&self) -> impl Iterator<Item = &String> {
        self.choices
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.correct_index)
            .map(|(_, c)| c)
    }
}

/// Word bank for a fill-in-the-blank item: one answer per blank plus distractors.
/// `answer_indices[k]` is the position of the answer for blank `k + 1`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct WordBank {
    pub choices: Vec<String>,
    pub answer_indices: Vec<usize>,
    #[serde(skip)]
    pub warnings: Vec<QualityWarning>,
}
