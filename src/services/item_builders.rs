use std::collections::BTreeMap;

use rand::Rng;

use crate::{
    errors::AppResult,
    models::{
        domain::{
            evaluation::placeholder, BlankQuestion, Category, CategoryQuota, Flashcard,
            GenerationParameters, ItemOrigin, MultipleChoiceQuestion, QualityWarning, SourceText,
            Span, ValidatedItem,
        },
        dto::generation_dto::{FillInBlankDto, MultipleChoiceDto},
    },
    services::{
        choice_set_builder::ChoiceSetBuilder, fallback_extractor::FallbackExtractor,
        repetition_tracker::FingerprintSet, span_locator::SpanLocator,
    },
};

use crate::models::domain::source_text::normalize_phrase;

const GAP_MARKER: &str = "_____";

pub fn flashcard_from(item: &ValidatedItem) -> Flashcard {
    Flashcard {
        id: String::new(),
        front: item.candidate.display_form(),
        surface: item.surface.clone(),
        category: item.category(),
        article: item.candidate.article.clone(),
        translation: item.candidate.translation.clone(),
        sentence: item.usage().to_string(),
        sentence_translation: item.candidate.usage_translation.clone(),
        word_span: item.word_span,
        sentence_span: item.usage_span,
        origin: item.origin,
    }
}

/// Grounds a proposed question. Returns `Ok(None)` (and a warning) when the proposal
/// cannot be used.
pub fn generated_question<R: Rng + ?Sized>(
    dto: &MultipleChoiceDto,
    source: &SourceText,
    params: &GenerationParameters,
    excluded: &FingerprintSet,
    warnings: &mut Vec<QualityWarning>,
    rng: &mut R,
) -> AppResult<Option<MultipleChoiceQuestion>> {
    let Some(category) = Category::from_label(&dto.category) else {
        warnings.push(rejected(&dto.target_word, "unknown category"));
        return Ok(None);
    };
    if excluded.contains(&dto.target_word) || excluded.contains(&dto.correct) {
        warnings.push(rejected(&dto.target_word, "word already used"));
        return Ok(None);
    }
    let Some(occurrence) = SpanLocator::locate_occurrence(&dto.target_word, &dto.sentence, source)
    else {
        warnings.push(rejected(&dto.target_word, "target or sentence not found in source"));
        return Ok(None);
    };

    // Compared with the source's spelling: the proposal may carry an article the text lacks.
    let target = source.slice(occurrence.word).to_string();
    let correct = normalize_phrase(&dto.correct);
    if correct.is_empty()
        || correct == normalize_phrase(&target)
        || correct == normalize_phrase(&dto.target_word)
    {
        warnings.push(rejected(&dto.target_word, "correct answer repeats the target word"));
        return Ok(None);
    }

    let window =
        source.occurrence_window(occurrence.sentence, occurrence.word, params.max_sentence_words);
    let set = ChoiceSetBuilder::build(
        &dto.correct,
        &dto.distractors,
        &target,
        params.choice_count,
        Some(category),
        rng,
    )?;

    let prompt = if dto.prompt.trim().is_empty() {
        format!("Was bedeutet „{}“ in diesem Satz?", target)
    } else {
        dto.prompt.trim().to_string()
    };
    let sentence_translation = if window == occurrence.sentence {
        non_blank(&dto.sentence_translation)
    } else {
        None
    };

    warnings.extend(set.warnings.iter().cloned());
    Ok(Some(MultipleChoiceQuestion {
        id: String::new(),
        prompt,
        target_word: target,
        sentence: source.slice(window).to_string(),
        sentence_translation,
        options: set.choices,
        correct_index: set.correct_index,
        explanation: non_blank(&dto.explanation),
        sentence_span: window,
        origin: ItemOrigin::Generated,
    }))
}

/// Gap question built from a fallback item: the word is masked in its sentence and the
/// learner picks it among words of the same category.
pub fn gap_question<R: Rng + ?Sized>(
    item: &ValidatedItem,
    pool: &[String],
    source: &SourceText,
    params: &GenerationParameters,
    warnings: &mut Vec<QualityWarning>,
    rng: &mut R,
) -> AppResult<MultipleChoiceQuestion> {
    let masked = mask(source, item.usage_span, &[item.word_span], |_| {
        GAP_MARKER.to_string()
    });
    let set = ChoiceSetBuilder::build(
        &item.surface,
        pool,
        "",
        params.choice_count,
        Some(item.category()),
        rng,
    )?;
    warnings.extend(set.warnings.iter().cloned());

    Ok(MultipleChoiceQuestion {
        id: String::new(),
        prompt: format!("Welches Wort passt in die Lücke? {}", masked),
        target_word: String::new(),
        sentence: item.usage().to_string(),
        sentence_translation: item.candidate.usage_translation.clone(),
        options: set.choices,
        correct_index: set.correct_index,
        explanation: None,
        sentence_span: item.usage_span,
        origin: ItemOrigin::Fallback,
    })
}

/// Grounds a proposed fill-in-the-blank sentence. Answers that cannot be found in the
/// sentence, repeat earlier phases or overlap each other are skipped; extra answers past
/// the band's blank count are cut.
pub fn generated_blank<R: Rng + ?Sized>(
    dto: &FillInBlankDto,
    source: &SourceText,
    params: &GenerationParameters,
    excluded: &FingerprintSet,
    warnings: &mut Vec<QualityWarning>,
    rng: &mut R,
) -> AppResult<Option<BlankQuestion>> {
    let Some(sentence) = SpanLocator::locate_sentence(&dto.sentence, source) else {
        warnings.push(rejected(&dto.sentence, "sentence not found in source"));
        return Ok(None);
    };

    let mut spans: Vec<Span> = Vec::new();
    let mut seen = FingerprintSet::new();
    for answer in &dto.answers {
        if excluded.contains(answer) {
            warnings.push(rejected(answer, "word already used"));
            continue;
        }
        if seen.contains(answer) {
            continue;
        }
        let Some(span) = SpanLocator::locate_word_within(answer, source, sentence) else {
            warnings.push(rejected(answer, "answer not found in its sentence"));
            continue;
        };
        if spans.iter().any(|s| s.start < span.end && span.start < s.end) {
            continue;
        }
        seen.insert(answer);
        spans.push(span);
    }
    spans.truncate(params.blank_count);
    if spans.is_empty() {
        warnings.push(rejected(&dto.sentence, "no usable answer"));
        return Ok(None);
    }

    let category = Category::from_label(&dto.category);
    let mut question = blank_question(
        source,
        sentence,
        &spans,
        &dto.distractors,
        category,
        params,
        warnings,
        rng,
    )?;
    question.origin = ItemOrigin::Generated;
    if question.sentence_span == sentence {
        question.sentence_translation = non_blank(&dto.sentence_translation);
    }
    Ok(Some(question))
}

/// Blank item over `answers` (word spans inside `sentence`), with a word bank of
/// `choice_count + answers - 1` entries.
#[allow(clippy::too_many_arguments)]
pub fn blank_question<R: Rng + ?Sized>(
    source: &SourceText,
    sentence: Span,
    answers: &[Span],
    pool: &[String],
    category: Option<Category>,
    params: &GenerationParameters,
    warnings: &mut Vec<QualityWarning>,
    rng: &mut R,
) -> AppResult<BlankQuestion> {
    let mut answers = answers.to_vec();
    answers.sort();

    let covering = Span::new(
        answers.first().map_or(sentence.start, |s| s.start),
        answers.last().map_or(sentence.end, |s| s.end),
    );
    let window = source.occurrence_window(sentence, covering, params.max_sentence_words);
    let template = mask(source, window, &answers, placeholder);
    let words: Vec<String> = answers.iter().map(|s| source.slice(*s).to_string()).collect();

    let bank = ChoiceSetBuilder::build_bank(
        &words,
        pool,
        params.choice_count + words.len() - 1,
        category,
        rng,
    )?;
    warnings.extend(bank.warnings.iter().cloned());

    Ok(BlankQuestion {
        id: String::new(),
        template,
        sentence: source.slice(window).to_string(),
        sentence_translation: None,
        options: bank.choices,
        correct_indices: bank.answer_indices,
        sentence_span: window,
        origin: ItemOrigin::Fallback,
    })
}

/// Every fallback item of the quota's categories that is not excluded, per category in
/// source order.
pub fn fallback_pool(
    extractor: &FallbackExtractor,
    source: &SourceText,
    quota: &CategoryQuota,
    excluded: &FingerprintSet,
) -> BTreeMap<Category, Vec<ValidatedItem>> {
    quota
        .categories()
        .map(|category| {
            let items = extractor.extract(source, excluded.terms(), category, usize::MAX);
            (category, items)
        })
        .collect()
}

/// Picks up to `needed` items, following the quota's category mix first.
pub fn pick_by_quota(
    pool: &BTreeMap<Category, Vec<ValidatedItem>>,
    quota: &CategoryQuota,
    needed: usize,
) -> Vec<ValidatedItem> {
    let mut picked: Vec<ValidatedItem> = Vec::new();
    for category in quota.categories() {
        let items = pool.get(&category).map(Vec::as_slice).unwrap_or(&[]);
        picked.extend(items.iter().take(quota.get(category)).cloned());
    }
    for items in pool.values() {
        for item in items {
            if !picked.contains(item) {
                picked.push(item.clone());
            }
        }
    }

    let mut seen = FingerprintSet::new();
    picked.retain(|item| {
        if seen.contains(&item.surface) {
            return false;
        }
        seen.insert(&item.surface);
        true
    });
    picked.truncate(needed);
    picked
}

/// Surfaces of `category` in `pool`, used as distractors.
pub fn surfaces_of(pool: &BTreeMap<Category, Vec<ValidatedItem>>, category: Category) -> Vec<String> {
    pool.get(&category)
        .map(|items| items.iter().map(|i| i.surface.clone()).collect())
        .unwrap_or_default()
}

/// Copy of `within` with every span in `holes` replaced by `marker(n)`, `n` counting from 1.
fn mask(source: &SourceText, within: Span, holes: &[Span], marker: impl Fn(usize) -> String) -> String {
    let mut out = String::new();
    let mut cursor = within.start;
    for (n, hole) in holes.iter().enumerate() {
        out.push_str(source.slice(Span::new(cursor, hole.start)));
        out.push_str(&marker(n + 1));
        cursor = hole.end;
    }
    out.push_str(source.slice(Span::new(cursor, within.end)));
    out
}

fn rejected(word: &str, reason: &str) -> QualityWarning {
    QualityWarning::CandidateRejected {
        word: word.to_string(),
        reason: reason.to_string(),
    }
    .raise()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{LearningGoal, ProficiencyBand},
        services::{choice_set_builder::leaks_target, level_config::LevelConfigResolver},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn source() -> SourceText {
        SourceText::new("Der Hund läuft schnell. Die Katze schläft.")
    }

    fn params() -> GenerationParameters {
        LevelConfigResolver::parameters_for(ProficiencyBand::B1, LearningGoal::General, None)
    }

    fn mcq(target: &str, sentence: &str, correct: &str) -> MultipleChoiceDto {
        MultipleChoiceDto {
            prompt: String::new(),
            target_word: target.into(),
            sentence: sentence.into(),
            correct: correct.into(),
            category: "verb".into(),
            distractors: vec!["schlafen".into(), "Hund".into(), "läuft".into()],
            explanation: None,
            sentence_translation: Some("The dog runs fast.".into()),
        }
    }

    #[test]
    fn test_generated_question_is_grounded_and_sized() {
        let source = source();
        let mut warnings = Vec::new();
        let question = generated_question(
            &mcq("läuft", "Der Hund läuft schnell.", "laufen"),
            &source,
            &params(),
            &FingerprintSet::new(),
            &mut warnings,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap()
        .unwrap();

        assert_eq!(question.target_word, "läuft");
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.options[question.correct_index], "laufen");
        assert_eq!(source.slice(question.sentence_span), question.sentence);
        for (i, option) in question.options.iter().enumerate() {
            if i != question.correct_index {
                assert!(!leaks_target(option, &question.target_word));
            }
        }
    }

    #[test]
    fn test_self_leaking_question_is_dropped() {
        let mut warnings = Vec::new();
        let question = generated_question(
            &mcq("läuft", "Der Hund läuft schnell.", "Läuft"),
            &source(),
            &params(),
            &FingerprintSet::new(),
            &mut warnings,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(question.is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_answer_equal_to_the_source_spelling_is_dropped_not_fatal() {
        let source = SourceText::new("Mein Hund schläft im Garten.");
        let mut dto = mcq("der Hund", "Mein Hund schläft im Garten.", "Hund");
        dto.category = "noun".into();
        let mut warnings = Vec::new();

        let question = generated_question(
            &dto,
            &source,
            &params(),
            &FingerprintSet::new(),
            &mut warnings,
            &mut StdRng::seed_from_u64(1),
        )
        .expect("a bad proposal must not fail the run");

        assert!(question.is_none());
        assert!(matches!(
            warnings.as_slice(),
            [QualityWarning::CandidateRejected { .. }]
        ));
    }

    #[test]
    fn test_question_about_an_excluded_word_is_dropped() {
        let mut excluded = FingerprintSet::new();
        excluded.insert("läuft");
        let mut warnings = Vec::new();
        let question = generated_question(
            &mcq("läuft", "Der Hund läuft schnell.", "laufen"),
            &source(),
            &params(),
            &excluded,
            &mut warnings,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(question.is_none());
    }

    #[test]
    fn test_generated_blank_masks_answers_in_order() {
        let source = source();
        let dto = FillInBlankDto {
            sentence: "Der Hund läuft schnell.".into(),
            answers: vec!["schnell".into(), "Hund".into(), "Vogel".into()],
            category: "noun".into(),
            distractors: vec!["Katze".into()],
            sentence_translation: None,
        };
        let mut warnings = Vec::new();
        let blank = generated_blank(
            &dto,
            &source,
            &params(),
            &FingerprintSet::new(),
            &mut warnings,
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap()
        .unwrap();

        assert_eq!(blank.template, "Der __[1]__ läuft __[2]__.");
        assert_eq!(blank.placeholder_count(), blank.correct_indices.len());
        assert_eq!(blank.options[blank.correct_indices[0]], "Hund");
        assert_eq!(blank.options[blank.correct_indices[1]], "schnell");
        assert_eq!(blank.options.len(), params().choice_count + 1);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, QualityWarning::CandidateRejected { word, .. } if word == "Vogel")));
    }

    #[test]
    fn test_gap_question_hides_the_word() {
        let source = source();
        let extractor = FallbackExtractor::default();
        let quota = CategoryQuota::new(&[(Category::Verb, 2)]);
        let pool = fallback_pool(&extractor, &source, &quota, &FingerprintSet::new());
        let items = pick_by_quota(&pool, &quota, 1);

        let mut warnings = Vec::new();
        let question = gap_question(
            &items[0],
            &surfaces_of(&pool, Category::Verb),
            &source,
            &params(),
            &mut warnings,
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();

        assert_eq!(question.prompt, "Welches Wort passt in die Lücke? Der Hund _____ schnell.");
        assert_eq!(question.options[question.correct_index], "läuft");
        assert!(question.options.contains(&"schläft".to_string()));
        assert!(question.target_word.is_empty());
        assert_eq!(question.origin, ItemOrigin::Fallback);
    }

    #[test]
    fn test_pick_by_quota_follows_the_mix() {
        let source = SourceText::new("Der Hund läuft schnell. Die Katze schläft. Das Pferd frisst.");
        let extractor = FallbackExtractor::default();
        let quota = CategoryQuota::new(&[(Category::Noun, 1), (Category::Verb, 1)]);
        let pool = fallback_pool(&extractor, &source, &quota, &FingerprintSet::new());

        let picked = pick_by_quota(&pool, &quota, 2);
        let categories: Vec<Category> = picked.iter().map(|i| i.category()).collect();
        assert_eq!(categories, vec![Category::Noun, Category::Verb]);

        let more = pick_by_quota(&pool, &quota, 4);
        assert_eq!(more.len(), 4);
    }

    #[test]
    fn test_flashcard_keeps_spans() {
        let source = source();
        let extractor = FallbackExtractor::default();
        let item = extractor
            .extract(&source, &Default::default(), Category::Noun, 1)
            .remove(0);
        let card = flashcard_from(&item);
        assert_eq!(card.front, "der Hund");
        assert_eq!(source.slice(card.word_span), card.surface);
        assert_eq!(source.slice(card.sentence_span), card.sentence);
    }
}
