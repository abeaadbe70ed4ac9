use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    constants::morphology::REMOVABLE_PREFIXES,
    models::domain::{
        candidate::ValidatedItem,
        choice_set::ChoiceSet,
        evaluation::{BlankQuestion, Flashcard, MultipleChoiceQuestion, Phase},
        source_text::normalize_phrase,
    },
};

/// Normalized words and phrases already used by earlier phases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FingerprintSet(BTreeSet<String>);

impl FingerprintSet {
    pub fn new() -> Self {
        FingerprintSet::default()
    }

    pub fn insert(&mut self, term: &str) {
        let normalized = normalize_phrase(term);
        if normalized.is_empty() {
            return;
        }
        if let Some(bare) = strip_prefix_token(&normalized) {
            self.0.insert(bare);
        }
        self.0.insert(normalized);
    }

    /// True when `word`, or `word` without a leading article/particle, was used before.
    pub fn contains(&self, word: &str) -> bool {
        let normalized = normalize_phrase(word);
        if normalized.is_empty() {
            return false;
        }
        self.0.contains(&normalized)
            || strip_prefix_token(&normalized).is_some_and(|bare| self.0.contains(&bare))
    }

    pub fn merge(&mut self, other: &FingerprintSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn is_disjoint(&self, other: &FingerprintSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn terms(&self) -> &BTreeSet<String> {
        &self.0
    }
}

fn strip_prefix_token(normalized: &str) -> Option<String> {
    let (head, rest) = normalized.split_once(' ')?;
    REMOVABLE_PREFIXES
        .contains(&head)
        .then(|| rest.trim().to_string())
        .filter(|r| !r.is_empty())
}

/// Terms an item contributes to the repetition denylist.
pub trait Fingerprinted {
    fn fingerprint_terms(&self) -> Vec<String>;
}

impl Fingerprinted for ValidatedItem {
    fn fingerprint_terms(&self) -> Vec<String> {
        vec![
            self.candidate.word.clone(),
            self.surface.clone(),
            self.candidate.lemma(),
        ]
    }
}

impl Fingerprinted for ChoiceSet {
    fn fingerprint_terms(&self) -> Vec<String> {
        vec![self.correct().to_string()]
    }
}

impl Fingerprinted for Flashcard {
    fn fingerprint_terms(&self) -> Vec<String> {
        vec![self.front.clone(), self.surface.clone()]
    }
}

impl Fingerprinted for MultipleChoiceQuestion {
    fn fingerprint_terms(&self) -> Vec<String> {
        let mut terms = vec![self.target_word.clone()];
        if let Some(correct) = self.options.get(self.correct_index) {
            terms.push(correct.clone());
        }
        terms
    }
}

impl Fingerprinted for BlankQuestion {
    fn fingerprint_terms(&self) -> Vec<String> {
        self.correct_indices
            .iter()
            .filter_map(|i| self.options.get(*i).cloned())
            .collect()
    }
}

/// Threads the fingerprints of finished phases forward to the ones still to run.
#[derive(Clone, Debug, Default)]
pub struct RepetitionTracker {
    by_phase: BTreeMap<Phase, FingerprintSet>,
}

impl RepetitionTracker {
    pub fn new() -> Self {
        RepetitionTracker::default()
    }

    pub fn extract_fingerprints<T: Fingerprinted>(items: &[T]) -> FingerprintSet {
        let mut set = FingerprintSet::new();
        for item in items {
            for term in item.fingerprint_terms() {
                set.insert(&term);
            }
        }
        set
    }

    pub fn merge(sets: &[&FingerprintSet]) -> FingerprintSet {
        let mut merged = FingerprintSet::new();
        for set in sets {
            merged.merge(set);
        }
        merged
    }

    /// Adds to whatever was recorded for `phase` before.
    pub fn record(&mut self, phase: Phase, fingerprints: FingerprintSet) {
        self.by_phase.entry(phase).or_default().merge(&fingerprints);
    }

    /// Union of everything recorded by phases that run before `phase`.
    pub fn denylist_for(&self, phase: Phase) -> FingerprintSet {
        let earlier: Vec<&FingerprintSet> = self
            .by_phase
            .iter()
            .filter(|(recorded, _)| **recorded < phase)
            .map(|(_, set)| set)
            .collect();
        Self::merge(&earlier)
    }

    pub fn recorded(&self, phase: Phase) -> Option<&FingerprintSet> {
        self.by_phase.get(&phase)
    }
}
