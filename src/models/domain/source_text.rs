use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:[-'’][\p{L}\p{N}]+)*").expect("WORD_REGEX is a valid regex pattern")
});

static CHUNK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+").expect("CHUNK_REGEX is a valid regex pattern"));

const CLOSING_MARKS: &[char] = &['"', '\'', '»', '«', '“', '”', '‘', '’', ')'];

/// Half-open byte range `[start, end)` into a [`SourceText`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema,
)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Lower-cases and collapses runs of whitespace.
pub fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`normalize_text`] with leading/trailing punctuation removed.
pub fn normalize_phrase(value: &str) -> String {
    let normalized = normalize_text(value);
    normalized
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Word tokens of an arbitrary string, lower-cased.
pub fn word_tokens(value: &str) -> Vec<String> {
    WORD_REGEX
        .find_iter(value)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// The immutable ground truth every learning item must be traced back to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    sentences: Vec<Span>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let sentences = split_sentences(&text);
        SourceText { text, sentences }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    pub fn sentences(&self) -> &[Span] {
        &self.sentences
    }

    pub fn sentence_containing(&self, span: Span) -> Option<Span> {
        self.sentences.iter().copied().find(|s| s.contains(&span))
    }

    /// Word token spans inside `within`, in source order.
    pub fn word_spans(&self, within: Span) -> Vec<Span> {
        let slice = self.slice(within);
        WORD_REGEX
            .find_iter(slice)
            .map(|m| Span::new(within.start + m.start(), within.start + m.end()))
            .collect()
    }

    /// Narrows `sentence` to at most `max_words` whitespace-separated words around
    /// `occurrence`, keeping as much context before as after. The result is always a
    /// contiguous substring of the sentence that still contains the occurrence.
    pub fn occurrence_window(&self, sentence: Span, occurrence: Span, max_words: usize) -> Span {
        let max_words = max_words.max(1);
        let slice = self.slice(sentence);
        let chunks: Vec<Span> = CHUNK_REGEX
            .find_iter(slice)
            .map(|m| Span::new(sentence.start + m.start(), sentence.start + m.end()))
            .collect();

        if chunks.len() <= max_words {
            return sentence;
        }

        let first = chunks.iter().position(|c| c.end > occurrence.start);
        let last = chunks.iter().rposition(|c| c.start < occurrence.end);
        let (Some(first), Some(last)) = (first, last) else {
            return sentence;
        };
        if last + 1 - first >= max_words {
            return Span::new(chunks[first].start, chunks[last].end);
        }

        let budget = max_words - (last + 1 - first);
        let mut before = first.min(budget / 2);
        let after = (chunks.len() - 1 - last).min(budget - before);
        before += first.saturating_sub(before).min(budget - before - after);

        Span::new(chunks[first - before].start, chunks[last + after].end)
    }

    /// SHA-256 of the text, hex encoded.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn split_sentences(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\n' => {
                push_trimmed(text, Span::new(start, idx), &mut spans);
                start = idx + ch.len_utf8();
            }
            '.' | '!' | '?' | '…' => {
                let mut end = idx + ch.len_utf8();
                while let Some(&(j, c)) = chars.peek() {
                    if matches!(c, '.' | '!' | '?' | '…') || CLOSING_MARKS.contains(&c) {
                        end = j + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let at_boundary = match chars.peek() {
                    None => true,
                    Some(&(_, c)) => c.is_whitespace(),
                };
                if at_boundary {
                    push_trimmed(text, Span::new(start, end), &mut spans);
                    start = end;
                }
            }
            _ => {}
        }
    }
    push_trimmed(text, Span::new(start, text.len()), &mut spans);
    spans
}

fn push_trimmed(text: &str, span: Span, spans: &mut Vec<Span>) {
    let raw = &text[span.start..span.end];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        let start = span.start + leading;
        spans.push(Span::new(start, start + trimmed.len()));
    }
}
