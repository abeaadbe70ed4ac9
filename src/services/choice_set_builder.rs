use std::collections::BTreeSet;

use rand::{seq::SliceRandom, Rng};

use crate::{
    constants::fillers::{filler_answers, numbered_placeholder, PLACEHOLDER_LABELS},
    errors::{AppError, AppResult},
    models::domain::{
        candidate::Category,
        choice_set::{ChoiceSet, WordBank},
        quality::QualityWarning,
        source_text::{normalize_phrase, word_tokens},
    },
};

/// Targets shorter than this only leak through an exact token match, never as part of a
/// compound.
const MIN_COMPOUND_TARGET_CHARS: usize = 3;

/// True when `option` would give away `target`: equal to it, containing it as a word, or
/// (for targets of three or more letters) starting or ending a compound with it.
///
/// The compound rule over-rejects ("Hundehütte" for "Hund") on purpose.
pub fn leaks_target(option: &str, target: &str) -> bool {
    let target = normalize_phrase(target);
    if target.is_empty() {
        return false;
    }
    let option = normalize_phrase(option);
    if option == target {
        return true;
    }

    let target_tokens = word_tokens(&target);
    let option_tokens = word_tokens(&option);
    if target_tokens.len() > 1 {
        let padded_option = format!(" {} ", option_tokens.join(" "));
        return padded_option.contains(&format!(" {} ", target_tokens.join(" ")));
    }

    let compound = target.chars().count() >= MIN_COMPOUND_TARGET_CHARS;
    option_tokens.iter().any(|token| {
        *token == target || (compound && (token.starts_with(&target) || token.ends_with(&target)))
    })
}

/// Builds answer sets of an exact size.
pub struct ChoiceSetBuilder;

impl ChoiceSetBuilder {
    /// One correct answer plus distractors from `pool`, padded or trimmed to
    /// `required_count`, then shuffled. `target_word` is the word the question shows; pass
    /// an empty string when the question embeds none.
    pub fn build<R: Rng + ?Sized>(
        correct: &str,
        pool: &[String],
        target_word: &str,
        required_count: usize,
        category: Option<Category>,
        rng: &mut R,
    ) -> AppResult<ChoiceSet> {
        let correct = correct.trim();
        if required_count == 0 {
            return Err(AppError::InvalidChoiceSetRequest(format!(
                "no room for the correct answer '{}'",
                correct
            )));
        }
        if normalize_phrase(correct).is_empty() {
            return Err(AppError::InvalidChoiceSetRequest(
                "correct answer is empty".to_string(),
            ));
        }
        if !target_word.trim().is_empty() && normalize_phrase(correct) == normalize_phrase(target_word)
        {
            return Err(AppError::InvalidChoiceSetRequest(format!(
                "correct answer '{}' repeats the question's target word",
                correct
            )));
        }

        let label = if target_word.trim().is_empty() {
            correct
        } else {
            target_word.trim()
        };
        let leak_targets = [target_word.to_string()];
        let (mut choices, warnings) = fill_to_size(
            vec![correct.to_string()],
            pool,
            &leak_targets,
            required_count,
            category,
            label,
        )?;

        choices.shuffle(rng);
        let wanted = normalize_phrase(correct);
        let correct_index = choices
            .iter()
            .position(|c| normalize_phrase(c) == wanted)
            .ok_or_else(|| {
                AppError::InternalError(format!("correct answer '{}' lost while shuffling", correct))
            })?;

        Ok(ChoiceSet {
            choices,
            correct_index,
            warnings,
        })
    }

    /// Word bank for a sentence with several blanks: every answer once, plus distractors,
    /// `max(required_count, answers.len())` entries in total.
    pub fn build_bank<R: Rng + ?Sized>(
        answers: &[String],
        pool: &[String],
        required_count: usize,
        category: Option<Category>,
        rng: &mut R,
    ) -> AppResult<WordBank> {
        if answers.is_empty() {
            return Err(AppError::InvalidChoiceSetRequest(
                "word bank needs at least one answer".to_string(),
            ));
        }
        let mut normalized = BTreeSet::new();
        for answer in answers {
            let key = normalize_phrase(answer);
            if key.is_empty() || !normalized.insert(key) {
                return Err(AppError::InvalidChoiceSetRequest(format!(
                    "word bank answers must be distinct and non-empty, got '{}'",
                    answer
                )));
            }
        }

        let fixed: Vec<String> = answers.iter().map(|a| a.trim().to_string()).collect();
        let label = fixed.join(" / ");
        let (mut choices, warnings) = fill_to_size(
            fixed.clone(),
            pool,
            &fixed,
            required_count.max(answers.len()),
            category,
            &label,
        )?;

        choices.shuffle(rng);
        let answer_indices = fixed
            .iter()
            .map(|answer| {
                let wanted = normalize_phrase(answer);
                choices
                    .iter()
                    .position(|c| normalize_phrase(c) == wanted)
                    .ok_or_else(|| {
                        AppError::InternalError(format!("answer '{}' lost while shuffling", answer))
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(WordBank {
            choices,
            answer_indices,
            warnings,
        })
    }
}

/// Keeps `fixed` at the front, then clean pool entries, fillers and numbered placeholders
/// until `size` is reached. Anything past `size` is cut from the tail. Fails only when
/// even the placeholders run out.
fn fill_to_size(
    fixed: Vec<String>,
    pool: &[String],
    leak_targets: &[String],
    size: usize,
    category: Option<Category>,
    label: &str,
) -> AppResult<(Vec<String>, Vec<QualityWarning>)> {
    let mut taken: BTreeSet<String> = fixed.iter().map(|f| normalize_phrase(f)).collect();
    let mut choices = fixed;
    let mut warnings = Vec::new();

    let admissible = |candidate: &str, taken: &BTreeSet<String>| {
        let key = normalize_phrase(candidate);
        !key.is_empty()
            && !taken.contains(&key)
            && !leak_targets.iter().any(|t| leaks_target(candidate, t))
    };

    for entry in pool {
        if admissible(entry, &taken) {
            taken.insert(normalize_phrase(entry));
            choices.push(entry.trim().to_string());
        }
    }

    if choices.len() < size {
        let mut fillers = 0;
        let generic = category.map(|_| filler_answers(None)).unwrap_or(&[]);
        for filler in filler_answers(category).iter().chain(generic.iter()) {
            if choices.len() >= size {
                break;
            }
            if admissible(filler, &taken) {
                taken.insert(normalize_phrase(filler));
                choices.push(filler.to_string());
                fillers += 1;
            }
        }
        if fillers > 0 {
            warnings.push(
                QualityWarning::FillerPadding {
                    target: label.to_string(),
                    fillers,
                }
                .raise(),
            );
        }
    }

    if choices.len() < size {
        let mut placeholders = 0;
        let candidates = PLACEHOLDER_LABELS
            .iter()
            .flat_map(|l| (1..=size).map(move |n| numbered_placeholder(l, n)));
        for candidate in candidates {
            if choices.len() >= size {
                break;
            }
            if admissible(&candidate, &taken) {
                taken.insert(normalize_phrase(&candidate));
                choices.push(candidate);
                placeholders += 1;
            }
        }
        if choices.len() < size {
            return Err(AppError::InvalidChoiceSetRequest(format!(
                "cannot pad '{}' to {} choices without leaking the target",
                label, size
            )));
        }
        warnings.push(
            QualityWarning::PlaceholderPadding {
                target: label.to_string(),
                placeholders,
            }
            .raise(),
        );
    }

    choices.truncate(size);
    Ok((choices, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn pool(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn pads_a_short_pool_with_fillers() {
        let set = ChoiceSetBuilder::build(
            "gehen",
            &pool(&["gehen", "kommt", "Hund"]),
            "Hund",
            4,
            Some(Category::Verb),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(set.choices.len(), 4);
        assert_eq!(set.correct(), "gehen");
        assert!(set.choices.contains(&"kommt".to_string()));
        assert!(!set.choices.contains(&"Hund".to_string()));
        assert_eq!(set.choices.iter().filter(|c| *c == "gehen").count(), 1);
        assert!(set
            .warnings
            .iter()
            .any(|w| matches!(w, QualityWarning::FillerPadding { fillers: 2, .. })));
    }

    #[test]
    fn unrelated_target_needs_a_single_filler() {
        let set = ChoiceSetBuilder::build(
            "gehen",
            &pool(&["gehen", "kommt", "Hund"]),
            "Katze",
            4,
            Some(Category::Verb),
            &mut rng(),
        )
        .unwrap();
        assert_eq!(set.choices.len(), 4);
        assert!(set
            .warnings
            .iter()
            .any(|w| matches!(w, QualityWarning::FillerPadding { fillers: 1, .. })));
    }

    #[test]
    fn distractors_never_leak_the_target() {
        let set = ChoiceSetBuilder::build(
            "die Katze",
            &pool(&["Hundehütte", "der HUND", "Haushund", "das Pferd", "die Maus"]),
            "Hund",
            3,
            Some(Category::Noun),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(set.choices.len(), 3);
        for distractor in set.distractors() {
            assert!(!leaks_target(distractor, "Hund"), "{} leaks", distractor);
        }
        assert_eq!(set.correct(), "die Katze");
    }

    #[test]
    fn trims_from_the_tail_but_keeps_the_correct_answer() {
        let set = ChoiceSetBuilder::build(
            "laufen",
            &pool(&["gehen", "rennen", "springen", "fahren", "fliegen"]),
            "",
            3,
            Some(Category::Verb),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(set.choices.len(), 3);
        assert_eq!(set.correct(), "laufen");
        assert!(!set.choices.contains(&"fliegen".to_string()));
        assert!(set.warnings.is_empty());
    }

    #[test]
    fn pool_is_deduplicated_case_insensitively() {
        let set = ChoiceSetBuilder::build(
            "laufen",
            &pool(&["Gehen", "gehen", " GEHEN "]),
            "",
            3,
            Some(Category::Verb),
            &mut rng(),
        )
        .unwrap();
        let gehen = set
            .choices
            .iter()
            .filter(|c| normalize_phrase(c) == "gehen")
            .count();
        assert_eq!(gehen, 1);
    }

    #[test]
    fn falls_back_to_numbered_placeholders() {
        let set = ChoiceSetBuilder::build("ja", &[], "", 8, None, &mut rng()).unwrap();
        assert_eq!(set.choices.len(), 8);
        assert_eq!(set.correct(), "ja");
        assert!(set.choices.contains(&"Option 1".to_string()));
        assert!(set
            .warnings
            .iter()
            .any(|w| matches!(w, QualityWarning::PlaceholderPadding { placeholders: 3, .. })));
    }

    #[test]
    fn placeholders_switch_label_when_the_target_leaks_into_them() {
        for target in ["Option", "opt", "ion"] {
            let set = ChoiceSetBuilder::build("ja", &[], target, 6, None, &mut rng()).unwrap();
            assert_eq!(set.choices.len(), 6);
            assert_eq!(set.correct(), "ja");
            for distractor in set.distractors() {
                assert!(!leaks_target(distractor, target), "{} leaks {}", distractor, target);
            }
            assert!(set.choices.iter().any(|c| c.starts_with("Antwort")));
        }
    }

    #[test]
    fn contract_violations_are_rejected() {
        assert!(matches!(
            ChoiceSetBuilder::build("gehen", &[], "", 0, None, &mut rng()),
            Err(AppError::InvalidChoiceSetRequest(_))
        ));
        assert!(matches!(
            ChoiceSetBuilder::build(" ", &[], "", 3, None, &mut rng()),
            Err(AppError::InvalidChoiceSetRequest(_))
        ));
        assert!(matches!(
            ChoiceSetBuilder::build("Hund", &[], "hund", 3, None, &mut rng()),
            Err(AppError::InvalidChoiceSetRequest(_))
        ));
    }

    #[test]
    fn same_seed_gives_the_same_order() {
        let entries = pool(&["gehen", "rennen", "springen"]);
        let a = ChoiceSetBuilder::build("laufen", &entries, "", 4, None, &mut rng()).unwrap();
        let b = ChoiceSetBuilder::build("laufen", &entries, "", 4, None, &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn word_bank_places_every_answer_once() {
        let answers = pool(&["läuft", "schläft"]);
        let bank = ChoiceSetBuilder::build_bank(
            &answers,
            &pool(&["läuft", "singt", "bellt"]),
            4,
            Some(Category::Verb),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(bank.choices.len(), 4);
        assert_eq!(bank.answer_indices.len(), 2);
        assert_eq!(bank.choices[bank.answer_indices[0]], "läuft");
        assert_eq!(bank.choices[bank.answer_indices[1]], "schläft");
        assert_eq!(bank.choices.iter().filter(|c| *c == "läuft").count(), 1);
    }

    #[test]
    fn word_bank_rejects_duplicate_answers() {
        let answers = pool(&["läuft", "Läuft"]);
        assert!(matches!(
            ChoiceSetBuilder::build_bank(&answers, &[], 3, None, &mut rng()),
            Err(AppError::InvalidChoiceSetRequest(_))
        ));
    }

    #[test]
    fn leak_detection_is_word_boundary_aware() {
        assert!(leaks_target("Hund", "hund"));
        assert!(leaks_target("der Hund", "Hund"));
        assert!(leaks_target("Hundehütte", "Hund"));
        assert!(!leaks_target("Katze", "Hund"));
        assert!(!leaks_target("Auto", "zu"));
        assert!(!leaks_target("anything", ""));
        assert!(leaks_target("ab und zu mal", "ab und zu"));
    }
}
