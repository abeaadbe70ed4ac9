use std::collections::{BTreeMap, BTreeSet};

use crate::{
    constants::morphology::REMOVABLE_PREFIXES,
    models::domain::{
        candidate::{CandidateItem, Category, ItemOrigin, ValidatedItem},
        generation::CategoryQuota,
        quality::QualityWarning,
        source_text::{normalize_phrase, SourceText},
    },
    services::{
        fallback_extractor::FallbackExtractor, repetition_tracker::FingerprintSet,
        span_locator::SpanLocator,
    },
};

/// Whether grounding reached every per-category quota.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// Items still missing per category after fallback extraction.
    Partial { missing: BTreeMap<Category, usize> },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }
}

#[derive(Clone, Debug)]
pub struct GroundingOutcome {
    /// Grouped by category, generated items before fallback ones.
    pub items: Vec<ValidatedItem>,
    pub completeness: Completeness,
    pub warnings: Vec<QualityWarning>,
}

impl GroundingOutcome {
    pub fn count(&self, category: Category) -> usize {
        self.items.iter().filter(|i| i.category() == category).count()
    }
}

/// Keeps only candidates whose word and usage are both found in the source, and tops up
/// short categories with [`FallbackExtractor`] output.
#[derive(Clone, Debug)]
pub struct GroundingValidator {
    max_sentence_words: usize,
    extractor: FallbackExtractor,
}

impl GroundingValidator {
    pub fn new(max_sentence_words: usize) -> Self {
        GroundingValidator {
            max_sentence_words: max_sentence_words.max(1),
            extractor: FallbackExtractor::new(max_sentence_words),
        }
    }

    pub fn validate(
        &self,
        candidates: &[CandidateItem],
        source: &SourceText,
        quota: &CategoryQuota,
        exclusions: &FingerprintSet,
    ) -> GroundingOutcome {
        let mut warnings = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut buckets: BTreeMap<Category, Vec<ValidatedItem>> = BTreeMap::new();

        for candidate in candidates {
            let wanted = quota.get(candidate.category);
            if wanted == 0 {
                log::debug!(
                    "ignoring {} candidate '{}': category not requested",
                    candidate.category,
                    candidate.word
                );
                continue;
            }

            if exclusions.contains(&candidate.word) || exclusions.contains(&candidate.lemma()) {
                warnings.push(reject(candidate, "already used in an earlier phase"));
                continue;
            }

            let Some(item) = self.ground(candidate, source) else {
                warnings.push(reject(candidate, "word or usage not found in source"));
                continue;
            };

            let keys = dedup_keys(&item);
            if keys.iter().any(|k| seen.contains(k)) {
                warnings.push(reject(candidate, "duplicate of an earlier candidate"));
                continue;
            }

            let bucket = buckets.entry(item.category()).or_default();
            if bucket.len() >= wanted {
                log::debug!(
                    "{} quota of {} already met, skipping '{}'",
                    item.category(),
                    wanted,
                    item.surface
                );
                continue;
            }
            seen.extend(keys);
            bucket.push(item);
        }

        let mut missing = BTreeMap::new();
        for category in quota.categories() {
            let wanted = quota.get(category);
            let have = buckets.get(&category).map_or(0, Vec::len);
            if have >= wanted {
                continue;
            }

            let mut already_found = seen.clone();
            already_found.extend(exclusions.terms().iter().cloned());
            let topped_up = self
                .extractor
                .extract(source, &already_found, category, wanted - have);
            log::debug!(
                "topped up {} {} item(s) from the source, {} short",
                topped_up.len(),
                category,
                wanted - have
            );
            for item in topped_up {
                seen.extend(dedup_keys(&item));
                buckets.entry(category).or_default().push(item);
            }

            let have = buckets.get(&category).map_or(0, Vec::len);
            if have < wanted {
                missing.insert(category, wanted - have);
            }
        }

        let completeness = if missing.is_empty() {
            Completeness::Complete
        } else {
            Completeness::Partial { missing }
        };

        GroundingOutcome {
            items: buckets.into_values().flatten().collect(),
            completeness,
            warnings,
        }
    }

    /// Resolves one candidate against the source. The stored word becomes the source's own
    /// spelling and the usage becomes the source sentence (trimmed to the word window).
    fn ground(&self, candidate: &CandidateItem, source: &SourceText) -> Option<ValidatedItem> {
        let mut candidate = split_leading_article(candidate);
        if candidate.word.trim().is_empty() {
            return None;
        }

        let occurrence = SpanLocator::locate_occurrence(&candidate.word, &candidate.usage, source)?;
        let usage_span =
            source.occurrence_window(occurrence.sentence, occurrence.word, self.max_sentence_words);

        let surface = source.slice(occurrence.word).to_string();
        if usage_span != occurrence.sentence {
            candidate.usage_translation = None;
        }
        candidate.word = surface.clone();
        candidate.usage = source.slice(usage_span).to_string();

        Some(ValidatedItem {
            candidate,
            surface,
            word_span: occurrence.word,
            usage_span,
            origin: ItemOrigin::Generated,
        })
    }
}

fn reject(candidate: &CandidateItem, reason: &str) -> QualityWarning {
    QualityWarning::CandidateRejected {
        word: candidate.word.clone(),
        reason: reason.to_string(),
    }
    .raise()
}

fn dedup_keys(item: &ValidatedItem) -> Vec<String> {
    let mut keys = vec![normalize_phrase(&item.surface)];
    let lemma = normalize_phrase(&item.candidate.lemma());
    if !keys.contains(&lemma) {
        keys.push(lemma);
    }
    keys
}

/// "der Hund" becomes word "Hund" with article "der" when no article was given.
fn split_leading_article(candidate: &CandidateItem) -> CandidateItem {
    let mut candidate = candidate.clone();
    if candidate.category != Category::Noun {
        return candidate;
    }
    let trimmed = candidate.word.trim().to_string();
    let Some((head, rest)) = trimmed.split_once(char::is_whitespace) else {
        candidate.word = trimmed;
        return candidate;
    };
    let head_lower = head.to_lowercase();
    if REMOVABLE_PREFIXES.contains(&head_lower.as_str()) && !rest.trim().is_empty() {
        if candidate.article.is_none() {
            candidate.article = Some(head_lower);
        }
        candidate.word = rest.trim().to_string();
    }
    candidate
}
