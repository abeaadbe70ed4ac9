use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::domain::source_text::Span;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Noun,
    Verb,
    Adjective,
    Expression,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Noun,
        Category::Verb,
        Category::Adjective,
        Category::Expression,
    ];

    /// Lenient parse for category labels coming back from the generator.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "noun" | "nomen" | "substantiv" | "n" => Some(Category::Noun),
            "verb" | "v" => Some(Category::Verb),
            "adjective" | "adj" | "adjektiv" => Some(Category::Adjective),
            "expression" | "phrase" | "idiom" | "ausdruck" => Some(Category::Expression),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Noun => write!(f, "noun"),
            Category::Verb => write!(f, "verb"),
            Category::Adjective => write!(f, "adjective"),
            Category::Expression => write!(f, "expression"),
        }
    }
}

/// A proposed learning item and the usage sentence it claims to come from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateItem {
    pub word: String,
    pub usage: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infinitive: Option<String>,
    /// Uninflected adjective form when the source shows an inflected one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_translation: Option<String>,
}

impl CandidateItem {
    pub fn new(word: impl Into<String>, usage: impl Into<String>, category: Category) -> Self {
        CandidateItem {
            word: word.into(),
            usage: usage.into(),
            category,
            article: None,
            infinitive: None,
            base_form: None,
            translation: None,
            usage_translation: None,
        }
    }

    pub fn with_article(mut self, article: impl Into<String>) -> Self {
        self.article = Some(article.into());
        self
    }

    pub fn with_infinitive(mut self, infinitive: impl Into<String>) -> Self {
        self.infinitive = Some(infinitive.into());
        self
    }

    pub fn with_base_form(mut self, base_form: impl Into<String>) -> Self {
        self.base_form = Some(base_form.into());
        self
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    /// Dictionary form: infinitive for verbs, base form for adjectives, else the word.
    pub fn lemma(&self) -> String {
        let preferred = match self.category {
            Category::Verb => self.infinitive.as_ref(),
            Category::Adjective => self.base_form.as_ref(),
            _ => None,
        };
        preferred
            .filter(|l| !l.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| self.word.clone())
    }

    /// Display form for a flashcard front: nouns carry their article.
    pub fn display_form(&self) -> String {
        match (&self.category, &self.article) {
            (Category::Noun, Some(article)) if !article.trim().is_empty() => {
                format!("{} {}", article.trim(), self.word.trim())
            }
            _ => self.lemma(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemOrigin {
    Generated,
    Fallback,
}

/// A candidate whose word and usage were both traced back to exact spans of the source.
///
/// `surface == source[word_span]` and `candidate.usage == source[usage_span]`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidatedItem {
    pub candidate: CandidateItem,
    pub surface: String,
    pub word_span: Span,
    pub usage_span: Span,
    pub origin: ItemOrigin,
}

impl ValidatedItem {
    pub fn category(&self) -> Category {
        self.candidate.category
    }

    pub fn word(&self) -> &str {
        &self.candidate.word
    }

    pub fn usage(&self) -> &str {
        &self.candidate.usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_are_lenient() {
        assert_eq!(Category::from_label(" Noun "), Some(Category::Noun));
        assert_eq!(Category::from_label("ADJ"), Some(Category::Adjective));
        assert_eq!(Category::from_label("phrase"), Some(Category::Expression));
        assert_eq!(Category::from_label("adverb"), None);
    }

    #[test]
    fn verb_lemma_prefers_infinitive() {
        let item = CandidateItem::new("läuft", "Der Hund läuft.", Category::Verb)
            .with_infinitive("laufen");
        assert_eq!(item.lemma(), "laufen");

        let bare = CandidateItem::new("Hund", "Der Hund läuft.", Category::Noun);
        assert_eq!(bare.lemma(), "Hund");
    }

    #[test]
    fn display_form_prefixes_noun_articles() {
        let noun = CandidateItem::new("Hund", "Der Hund läuft.", Category::Noun).with_article("der");
        assert_eq!(noun.display_form(), "der Hund");

        let adjective = CandidateItem::new("schnelle", "Das schnelle Auto.", Category::Adjective)
            .with_base_form("schnell");
        assert_eq!(adjective.display_form(), "schnell");
    }
}
