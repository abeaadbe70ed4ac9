use std::collections::BTreeSet;

use crate::{
    constants::morphology::{
        article_for_suffix, lookup_infinitive, ADJECTIVE_INFLECTIONS, ADJECTIVE_SUFFIXES,
        AUXILIARY_FORMS, COMMON_ADJECTIVES, DEFAULT_ARTICLE, DETERMINERS, NON_NOUNS,
    },
    models::domain::{
        candidate::{CandidateItem, Category, ItemOrigin, ValidatedItem},
        source_text::{normalize_phrase, SourceText, Span},
    },
    services::span_locator::SpanLocator,
};

pub const DEFAULT_MAX_SENTENCE_WORDS: usize = 20;

/// Rule-based extraction of learning items straight from the source text.
///
/// Every item is cut out of the source, so it comes back already carrying its spans.
/// Article and base-form metadata is inferred from the tables in
/// [`crate::constants::morphology`] and is an approximation.
#[derive(Clone, Debug)]
pub struct FallbackExtractor {
    max_sentence_words: usize,
}

impl Default for FallbackExtractor {
    fn default() -> Self {
        FallbackExtractor::new(DEFAULT_MAX_SENTENCE_WORDS)
    }
}

struct Token<'a> {
    span: Span,
    text: &'a str,
    lower: String,
}

impl<'a> Token<'a> {
    fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }
}

impl FallbackExtractor {
    pub fn new(max_sentence_words: usize) -> Self {
        FallbackExtractor {
            max_sentence_words: max_sentence_words.max(1),
        }
    }

    /// Up to `max` new items of `category`, in source order, one per lemma. Anything whose
    /// normalized word or lemma is in `already_found` is skipped.
    pub fn extract(
        &self,
        source: &SourceText,
        already_found: &BTreeSet<String>,
        category: Category,
        max: usize,
    ) -> Vec<ValidatedItem> {
        let mut seen = already_found.clone();
        let mut items = Vec::new();
        if max == 0 {
            return items;
        }

        for sentence in source.sentences() {
            let tokens: Vec<Token> = source
                .word_spans(*sentence)
                .into_iter()
                .map(|span| {
                    let text = source.slice(span);
                    Token {
                        span,
                        text,
                        lower: text.to_lowercase(),
                    }
                })
                .collect();

            for i in 0..tokens.len() {
                let Some((candidate, word_span)) = match_category(&tokens, i, category) else {
                    continue;
                };

                let lemma_key = normalize_phrase(&candidate.lemma());
                let surface_key = normalize_phrase(source.slice(word_span));
                if seen.contains(&lemma_key) || seen.contains(&surface_key) {
                    continue;
                }
                seen.insert(lemma_key);
                seen.insert(surface_key);

                let usage_span =
                    source.occurrence_window(*sentence, word_span, self.max_sentence_words);
                let mut candidate = candidate;
                candidate.usage = source.slice(usage_span).to_string();

                items.push(ValidatedItem {
                    surface: source.slice(word_span).to_string(),
                    candidate,
                    word_span,
                    usage_span,
                    origin: ItemOrigin::Fallback,
                });
                if items.len() >= max {
                    return items;
                }
            }
        }

        log::debug!(
            "fallback extraction found {} {} item(s), {} requested",
            items.len(),
            category,
            max
        );
        items
    }
}

impl FallbackExtractor {
    /// Every sentence `item`'s word occurs in, as word spans: the item's own span first,
    /// then the first occurrence in each other sentence in source order. Extraction keeps
    /// one item per lemma; these are its alternative usage sentences.
    pub fn occurrences(source: &SourceText, item: &ValidatedItem) -> Vec<Span> {
        let own = source.sentence_containing(item.word_span);
        let mut spans = vec![item.word_span];
        for sentence in source.sentences() {
            if Some(*sentence) == own {
                continue;
            }
            if let Some(word) = SpanLocator::locate_word_within(&item.surface, source, *sentence) {
                spans.push(word);
            }
        }
        spans
    }
}

fn match_category(tokens: &[Token], i: usize, category: Category) -> Option<(CandidateItem, Span)> {
    match category {
        Category::Noun => noun_at(tokens, i).map(|c| (c, tokens[i].span)),
        Category::Verb => verb_at(tokens, i).map(|c| (c, tokens[i].span)),
        Category::Adjective => adjective_at(tokens, i).map(|c| (c, tokens[i].span)),
        Category::Expression => expression_at(tokens, i),
    }
}

/// Capitalised and not a function word. Inside a sentence the capital is enough; the
/// first word of a sentence needs [`sentence_initial_noun`].
fn noun_at(tokens: &[Token], i: usize) -> Option<CandidateItem> {
    let token = &tokens[i];
    if !token.is_capitalized() || token.text.chars().count() < 2 {
        return None;
    }
    if NON_NOUNS.contains(&token.lower.as_str()) || DETERMINERS.contains(&token.lower.as_str()) {
        return None;
    }
    if i == 0 && !sentence_initial_noun(tokens) {
        return None;
    }
    if token.text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let previous = i.checked_sub(1).map(|p| tokens[p].lower.as_str());
    Some(
        CandidateItem::new(token.text, "", Category::Noun)
            .with_article(infer_article(token.text, previous)),
    )
}

/// A sentence-initial capital only counts when nothing else explains it: the word is no
/// known verb or adjective and a lowercase word follows, as in "Hunde bellen laut."
fn sentence_initial_noun(tokens: &[Token]) -> bool {
    let first = &tokens[0];
    if lookup_infinitive(&first.lower).is_some()
        || AUXILIARY_FORMS.contains(&first.lower.as_str())
        || adjective_base(&first.lower).is_some()
    {
        return false;
    }
    tokens.get(1).is_some_and(|next| !next.is_capitalized())
}

/// Article rules, in order: noun ending, a directly preceding `das`/`der`, the default.
pub fn infer_article(noun: &str, previous: Option<&str>) -> &'static str {
    if let Some(article) = article_for_suffix(noun) {
        return article;
    }
    match previous {
        Some("das") => "das",
        Some("der") => "der",
        _ => DEFAULT_ARTICLE,
    }
}

fn verb_at(tokens: &[Token], i: usize) -> Option<CandidateItem> {
    let token = &tokens[i];
    if token.is_capitalized() && i > 0 {
        return None;
    }
    if AUXILIARY_FORMS.contains(&token.lower.as_str()) {
        return None;
    }

    if let Some(infinitive) = lookup_infinitive(&token.lower) {
        return Some(CandidateItem::new(token.text, "", Category::Verb).with_infinitive(infinitive));
    }

    let after_zu = i > 0 && tokens[i - 1].lower == "zu";
    if after_zu && !token.is_capitalized() && token.lower.ends_with("en") && token.lower.len() > 4 {
        return Some(
            CandidateItem::new(token.text, "", Category::Verb).with_infinitive(token.lower.clone()),
        );
    }
    None
}

fn adjective_at(tokens: &[Token], i: usize) -> Option<CandidateItem> {
    let token = &tokens[i];
    if token.is_capitalized() {
        return None;
    }
    if lookup_infinitive(&token.lower).is_some() || AUXILIARY_FORMS.contains(&token.lower.as_str())
    {
        return None;
    }
    adjective_base(&token.lower).map(|base| {
        CandidateItem::new(token.text, "", Category::Adjective).with_base_form(base)
    })
}

/// Base form of an adjective, or `None` when no rule recognises the word.
pub fn adjective_base(lower: &str) -> Option<String> {
    if is_adjective_base(lower) {
        return Some(lower.to_string());
    }
    ADJECTIVE_INFLECTIONS.iter().find_map(|ending| {
        lower
            .strip_suffix(ending)
            .filter(|stem| is_adjective_base(stem))
            .map(str::to_string)
    })
}

fn is_adjective_base(word: &str) -> bool {
    if COMMON_ADJECTIVES.contains(&word) {
        return true;
    }
    ADJECTIVE_SUFFIXES
        .iter()
        .any(|suffix| word.len() > suffix.len() + 2 && word.ends_with(suffix))
}

/// Adjective directly followed by a noun, e.g. "kleine Katze".
fn expression_at(tokens: &[Token], i: usize) -> Option<(CandidateItem, Span)> {
    let adjective = adjective_at(tokens, i)?;
    let next = tokens.get(i + 1)?;
    noun_at(tokens, i + 1)?;

    let phrase = format!("{} {}", adjective.word, next.text);
    let span = Span::new(tokens[i].span.start, next.span.end);
    Some((CandidateItem::new(phrase, "", Category::Expression), span))
}
