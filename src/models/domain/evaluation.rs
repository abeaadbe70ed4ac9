use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::domain::{
    candidate::{Category, ItemOrigin},
    generation::GenerationParameters,
    profile::ProficiencyBand,
    quality::QualityWarning,
    source_text::Span,
};

static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"__\[(\d+)\]__").expect("PLACEHOLDER_REGEX is a valid regex pattern")
});

/// Renders the marker for blank number `n` (1-based).
pub fn placeholder(n: usize) -> String {
    format!("__[{}]__", n)
}

pub fn count_placeholders(template: &str) -> usize {
    PLACEHOLDER_REGEX.find_iter(template).count()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Flashcards,
    MultipleChoice,
    FillInBlank,
}

impl Phase {
    pub const ORDERED: [Phase; 3] = [Phase::Flashcards, Phase::MultipleChoice, Phase::FillInBlank];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Flashcards => write!(f, "flashcards"),
            Phase::MultipleChoice => write!(f, "multiple_choice"),
            Phase::FillInBlank => write!(f, "fill_in_blank"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Flashcard {
    pub id: String,
    /// Display form: article + noun, infinitive for verbs.
    pub front: String,
    pub surface: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    pub sentence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_translation: Option<String>,
    pub word_span: Span,
    pub sentence_span: Span,
    pub origin: ItemOrigin,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MultipleChoiceQuestion {
    pub id: String,
    pub prompt: String,
    /// The source word the question is about; empty when the prompt embeds no target.
    pub target_word: String,
    pub sentence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_translation: Option<String>,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub sentence_span: Span,
    pub origin: ItemOrigin,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlankQuestion {
    pub id: String,
    /// Sentence with `__[n]__` markers in place of the answers.
    pub template: String,
    pub sentence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_translation: Option<String>,
    pub options: Vec<String>,
    pub correct_indices: Vec<usize>,
    pub sentence_span: Span,
    pub origin: ItemOrigin,
}

impl BlankQuestion {
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.template)
    }
}

/// Identity of the single live evaluation for a source and a personalization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct EvaluationKey {
    pub source_id: String,
    pub personalization_id: String,
}

impl EvaluationKey {
    pub fn new(source_id: impl Into<String>, personalization_id: impl Into<String>) -> Self {
        EvaluationKey {
            source_id: source_id.into(),
            personalization_id: personalization_id.into(),
        }
    }
}

impl fmt::Display for EvaluationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.personalization_id)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EvaluationDocument {
    pub id: String,
    pub source_id: String,
    pub personalization_id: String,
    pub source_hash: String,
    pub band: ProficiencyBand,
    pub parameters: GenerationParameters,
    pub flashcards: Vec<Flashcard>,
    pub multiple_choice: Vec<MultipleChoiceQuestion>,
    pub fill_in_blank: Vec<BlankQuestion>,
    #[serde(default)]
    pub warnings: Vec<QualityWarning>,
    pub committed_at: DateTime<Utc>,
}

impl EvaluationDocument {
    pub fn key(&self) -> EvaluationKey {
        EvaluationKey::new(self.source_id.clone(), self.personalization_id.clone())
    }

    pub fn phase_len(&self, phase: Phase) -> usize {
        match phase {
            Phase::Flashcards => self.flashcards.len(),
            Phase::MultipleChoice => self.multiple_choice.len(),
            Phase::FillInBlank => self.fill_in_blank.len(),
        }
    }
}
