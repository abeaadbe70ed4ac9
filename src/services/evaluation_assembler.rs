use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        evaluation::{
            BlankQuestion, EvaluationDocument, EvaluationKey, Flashcard, MultipleChoiceQuestion,
            Phase,
        },
        generation::GenerationParameters,
        profile::ProficiencyBand,
        quality::QualityWarning,
        source_text::{normalize_text, SourceText, Span},
    },
};

/// Items produced by the three phases of one run, before cross-field checks.
#[derive(Clone, Debug, Default)]
pub struct PhaseDrafts {
    pub flashcards: Vec<Flashcard>,
    pub multiple_choice: Vec<MultipleChoiceQuestion>,
    pub fill_in_blank: Vec<BlankQuestion>,
    pub warnings: Vec<QualityWarning>,
}

pub struct AssemblyContext<'a> {
    pub key: &'a EvaluationKey,
    pub source: &'a SourceText,
    pub band: ProficiencyBand,
    pub parameters: &'a GenerationParameters,
    pub mandatory: &'a [Phase],
}

pub struct EvaluationAssembler;

impl EvaluationAssembler {
    /// Repairs what can be repaired, drops what cannot, and refuses to produce a document
    /// with an empty mandatory phase.
    pub fn assemble(drafts: PhaseDrafts, ctx: AssemblyContext<'_>) -> AppResult<EvaluationDocument> {
        let PhaseDrafts {
            mut flashcards,
            mut multiple_choice,
            mut fill_in_blank,
            mut warnings,
        } = drafts;

        assign_ids(&mut flashcards, "fc", |f| &mut f.id);
        assign_ids(&mut multiple_choice, "mc", |q| &mut q.id);
        assign_ids(&mut fill_in_blank, "fb", |q| &mut q.id);

        for card in flashcards.iter_mut() {
            if card.sentence.trim().is_empty() {
                card.sentence = ctx.source.slice(card.sentence_span).to_string();
            }
        }
        flashcards.retain(|card| {
            let keep = !card.sentence.trim().is_empty() && !card.front.trim().is_empty();
            if !keep {
                warnings.push(dropped(Phase::Flashcards, &card.id, "missing front or sentence"));
            }
            keep
        });

        let translations = sentence_translations(&flashcards);

        multiple_choice.retain_mut(|question| {
            if question.options.len() != ctx.parameters.choice_count {
                warnings.push(dropped(
                    Phase::MultipleChoice,
                    &question.id,
                    &format!(
                        "{} options instead of {}",
                        question.options.len(),
                        ctx.parameters.choice_count
                    ),
                ));
                return false;
            }
            if question.correct_index >= question.options.len() {
                warnings.push(dropped(
                    Phase::MultipleChoice,
                    &question.id,
                    "correct index out of bounds",
                ));
                return false;
            }
            fill_sentence(
                &mut question.sentence,
                &mut question.sentence_translation,
                question.sentence_span,
                ctx.source,
                &translations,
            );
            true
        });

        fill_in_blank.retain_mut(|question| {
            if let Some(warning) = Self::repair_blank(question) {
                warnings.push(warning);
            }
            if question.correct_indices.is_empty() {
                warnings.push(dropped(Phase::FillInBlank, &question.id, "no blank in template"));
                return false;
            }
            if question
                .correct_indices
                .iter()
                .any(|i| *i >= question.options.len())
            {
                warnings.push(dropped(
                    Phase::FillInBlank,
                    &question.id,
                    "correct index out of bounds",
                ));
                return false;
            }
            fill_sentence(
                &mut question.sentence,
                &mut question.sentence_translation,
                question.sentence_span,
                ctx.source,
                &translations,
            );
            true
        });

        let document = EvaluationDocument {
            id: Uuid::new_v4().to_string(),
            source_id: ctx.key.source_id.clone(),
            personalization_id: ctx.key.personalization_id.clone(),
            source_hash: ctx.source.content_hash(),
            band: ctx.band,
            parameters: ctx.parameters.clone(),
            flashcards,
            multiple_choice,
            fill_in_blank,
            warnings,
            committed_at: Utc::now(),
        };

        for phase in ctx.mandatory {
            if document.phase_len(*phase) == 0 {
                return Err(AppError::IncompleteEvaluation(format!(
                    "mandatory phase {} has no items for {}",
                    phase, ctx.key
                )));
            }
        }
        Ok(document)
    }

    /// Makes the number of correct indices match the number of `__[n]__` markers, cutting
    /// extra indices or repeating the first one. Never adds a marker.
    pub fn repair_blank(question: &mut BlankQuestion) -> Option<QualityWarning> {
        let placeholders = question.placeholder_count();
        let indices = question.correct_indices.len();
        if placeholders == indices {
            return None;
        }

        if placeholders == 0 {
            question.correct_indices.clear();
        } else if indices > placeholders {
            question.correct_indices.truncate(placeholders);
        } else if let Some(first) = question.correct_indices.first().copied() {
            question.correct_indices.resize(placeholders, first);
        }

        Some(
            QualityWarning::BlankIndexMismatch {
                item_id: question.id.clone(),
                placeholders,
                indices,
            }
            .raise(),
        )
    }
}

fn assign_ids<T>(items: &mut [T], prefix: &str, id: impl Fn(&mut T) -> &mut String) {
    for (n, item) in items.iter_mut().enumerate() {
        *id(item) = format!("{}-{}", prefix, n + 1);
    }
}

fn dropped(phase: Phase, item_id: &str, reason: &str) -> QualityWarning {
    QualityWarning::ItemDropped {
        phase,
        item_id: item_id.to_string(),
        reason: reason.to_string(),
    }
    .raise()
}

fn sentence_translations(flashcards: &[Flashcard]) -> HashMap<String, String> {
    flashcards
        .iter()
        .filter_map(|card| {
            card.sentence_translation
                .as_ref()
                .filter(|t| !t.trim().is_empty())
                .map(|t| (normalize_text(&card.sentence), t.clone()))
        })
        .collect()
}

fn fill_sentence(
    sentence: &mut String,
    translation: &mut Option<String>,
    span: Span,
    source: &SourceText,
    translations: &HashMap<String, String>,
) {
    if sentence.trim().is_empty() {
        *sentence = source.slice(span).to_string();
    }
    if translation.is_none() {
        *translation = translations.get(&normalize_text(sentence)).cloned();
    }
}
