use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{CandidateItem, Category},
};

/// One learning item as the generator proposes it.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CandidateDto {
    /// The word or phrase exactly as it appears in the text.
    pub word: String,
    /// The full sentence from the text in which the word appears.
    pub usage: String,
    /// One of: noun, verb, adjective, expression.
    pub category: String,
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub infinitive: Option<String>,
    #[serde(default)]
    pub base_form: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub usage_translation: Option<String>,
}

impl CandidateDto {
    /// `None` when the category label is not recognised.
    pub fn into_candidate(self) -> Option<CandidateItem> {
        let category = Category::from_label(&self.category)?;
        Some(CandidateItem {
            word: self.word,
            usage: self.usage,
            category,
            article: non_blank(self.article),
            infinitive: non_blank(self.infinitive),
            base_form: non_blank(self.base_form),
            translation: non_blank(self.translation),
            usage_translation: non_blank(self.usage_translation),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct VocabularyProposal {
    pub items: Vec<CandidateDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MultipleChoiceDto {
    /// Question shown to the learner.
    pub prompt: String,
    /// The word from the text the question asks about.
    pub target_word: String,
    /// Sentence from the text the question is based on.
    pub sentence: String,
    /// The correct answer. Must not be the target word itself.
    pub correct: String,
    pub category: String,
    #[serde(default)]
    pub distractors: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub sentence_translation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MultipleChoiceProposal {
    pub questions: Vec<MultipleChoiceDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FillInBlankDto {
    /// Sentence copied from the text, without any gaps.
    pub sentence: String,
    /// Words of the sentence to blank out, in sentence order.
    pub answers: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub distractors: Vec<String>,
    #[serde(default)]
    pub sentence_translation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FillInBlankProposal {
    pub items: Vec<FillInBlankDto>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pretty-printed JSON schema of `T`, embedded in generation instructions.
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// The JSON object inside a generator reply: markdown fences and any prose around the
/// outermost braces are dropped.
pub fn extract_json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Parses a generator reply into a strict proposal type.
pub fn parse_proposal<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    serde_json::from_str(extract_json_payload(raw)).map_err(|e| {
        AppError::ValidationError(format!("malformed generator output: {}", e))
    })
}
