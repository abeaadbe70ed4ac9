use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::source_text::SourceText;

/// A stored article or transcript as supplied by the content side.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Shorter curated version of `content`; grounding runs against it when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl SourceDocument {
    pub fn new(id: &str, title: &str, content: &str) -> Self {
        SourceDocument {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            excerpt: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn source_text(&self) -> SourceText {
        let canonical = self
            .excerpt
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.content.trim());
        SourceText::new(canonical)
    }
}
