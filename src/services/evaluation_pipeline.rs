use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rand::{rngs::StdRng, SeedableRng};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::{
    constants::prompts::{
        fill_template, FILL_IN_BLANK_INSTRUCTIONS, FLASHCARD_INSTRUCTIONS,
        MULTIPLE_CHOICE_INSTRUCTIONS,
    },
    errors::{AppError, AppResult},
    models::{
        domain::{
            BlankQuestion, EvaluationDocument, EvaluationKey, GenerationParameters,
            LearnerProfile, MultipleChoiceQuestion, Phase, QualityWarning, SourceText, Span,
            ValidatedItem,
        },
        dto::generation_dto::{
            parse_proposal, schema_json, FillInBlankProposal, MultipleChoiceProposal,
            VocabularyProposal,
        },
    },
    services::{
        evaluation_assembler::{AssemblyContext, EvaluationAssembler, PhaseDrafts},
        fallback_extractor::FallbackExtractor,
        grounding_validator::GroundingValidator,
        item_builders,
        level_config::LevelConfigResolver,
        phase_steps::{create_evaluation_steps, PhaseStep},
        repetition_tracker::{FingerprintSet, Fingerprinted, RepetitionTracker},
        text_generation_service::{generate_with_retry, GenerationPolicy, TextGenerationService},
    },
};

/// Where a generation run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Requested,
    PhaseGenerating(Phase),
    Assembling,
    Committed,
    Rejected,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Committed | RunState::Rejected)
    }

    fn can_advance_to(&self, next: RunState) -> bool {
        match (self, next) {
            (from, RunState::Rejected) => !from.is_terminal(),
            (RunState::Requested, RunState::PhaseGenerating(_)) => true,
            (RunState::PhaseGenerating(from), RunState::PhaseGenerating(to)) => *from < to,
            (RunState::PhaseGenerating(_), RunState::Assembling) => true,
            (RunState::Assembling, RunState::Committed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Requested => write!(f, "requested"),
            RunState::PhaseGenerating(phase) => write!(f, "generating {}", phase),
            RunState::Assembling => write!(f, "assembling"),
            RunState::Committed => write!(f, "committed"),
            RunState::Rejected => write!(f, "rejected"),
        }
    }
}

/// State machine of one run. Phases only move forward; a terminal state is final.
#[derive(Debug)]
pub struct RunLifecycle {
    key: EvaluationKey,
    state: RunState,
}

impl RunLifecycle {
    pub fn new(key: EvaluationKey) -> Self {
        log::info!("evaluation run for {} requested", key);
        RunLifecycle {
            key,
            state: RunState::Requested,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) -> AppResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(AppError::InternalError(format!(
                "run for {} cannot go from {} to {}",
                self.key, self.state, next
            )));
        }
        log::info!("evaluation run for {}: {} -> {}", self.key, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Moves to `Rejected` unless the run already ended.
    pub fn reject(&mut self, reason: &AppError) {
        if self.state.is_terminal() {
            return;
        }
        log::warn!(
            "evaluation run for {} rejected while {}: {}",
            self.key,
            self.state,
            reason
        );
        self.state = RunState::Rejected;
    }
}

/// Shared flag a caller flips to stop a run between phases.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct RunRequest<'a> {
    pub key: &'a EvaluationKey,
    pub source: &'a SourceText,
    pub profile: &'a LearnerProfile,
    pub cancellation: &'a CancellationFlag,
}

struct PhaseContext<'a> {
    step: &'a PhaseStep,
    source: &'a SourceText,
    profile: &'a LearnerProfile,
    params: &'a GenerationParameters,
    excluded: FingerprintSet,
}

/// Runs the generation phases in order and assembles their output. Persisting the
/// result is left to the caller.
pub struct EvaluationPipeline {
    generator: Arc<dyn TextGenerationService>,
    policy: GenerationPolicy,
    steps: Vec<PhaseStep>,
}

impl EvaluationPipeline {
    pub fn new(generator: Arc<dyn TextGenerationService>, policy: GenerationPolicy) -> Self {
        Self {
            generator,
            policy,
            steps: create_evaluation_steps(),
        }
    }

    pub fn steps(&self) -> &[PhaseStep] {
        &self.steps
    }

    pub async fn run(
        &self,
        request: RunRequest<'_>,
        lifecycle: &mut RunLifecycle,
    ) -> AppResult<EvaluationDocument> {
        let params = LevelConfigResolver::resolve(request.profile)?;
        if request.source.is_empty() {
            return Err(AppError::ValidationError(format!(
                "source {} has no text",
                request.key.source_id
            )));
        }

        let mut rng = seeded_rng(request.source, request.key);
        let mut tracker = RepetitionTracker::new();
        let mut drafts = PhaseDrafts::default();

        for step in &self.steps {
            ensure_not_cancelled(request.cancellation, request.key)?;
            lifecycle.advance(RunState::PhaseGenerating(step.phase))?;

            let ctx = PhaseContext {
                step,
                source: request.source,
                profile: request.profile,
                params: &params,
                excluded: tracker.denylist_for(step.phase),
            };
            let fingerprints = match step.phase {
                Phase::Flashcards => {
                    let items = self.flashcard_phase(&ctx, &mut drafts.warnings).await;
                    drafts.flashcards = items.iter().map(item_builders::flashcard_from).collect();
                    RepetitionTracker::extract_fingerprints(&items)
                }
                Phase::MultipleChoice => {
                    let questions = self
                        .multiple_choice_phase(&ctx, &mut drafts.warnings, &mut rng)
                        .await?;
                    let fingerprints = RepetitionTracker::extract_fingerprints(&questions);
                    drafts.multiple_choice = questions;
                    fingerprints
                }
                Phase::FillInBlank => {
                    let blanks = self
                        .fill_in_blank_phase(&ctx, &mut drafts.warnings, &mut rng)
                        .await?;
                    let fingerprints = RepetitionTracker::extract_fingerprints(&blanks);
                    drafts.fill_in_blank = blanks;
                    fingerprints
                }
            };
            log::debug!(
                "{} phase for {} recorded {} fingerprint(s)",
                step.phase,
                request.key,
                fingerprints.len()
            );
            tracker.record(step.phase, fingerprints);
        }
        ensure_not_cancelled(request.cancellation, request.key)?;

        lifecycle.advance(RunState::Assembling)?;
        let mandatory: Vec<Phase> = self
            .steps
            .iter()
            .filter(|s| s.mandatory)
            .map(|s| s.phase)
            .collect();
        EvaluationAssembler::assemble(
            drafts,
            AssemblyContext {
                key: request.key,
                source: request.source,
                band: request.profile.band,
                parameters: &params,
                mandatory: &mandatory,
            },
        )
    }

    async fn flashcard_phase(
        &self,
        ctx: &PhaseContext<'_>,
        warnings: &mut Vec<QualityWarning>,
    ) -> Vec<ValidatedItem> {
        let instructions = instructions(
            FLASHCARD_INSTRUCTIONS,
            ctx,
            schema_json::<VocabularyProposal>(),
        );
        let proposal: Option<VocabularyProposal> = self.propose(ctx.step, &instructions, warnings).await;

        let mut candidates = Vec::new();
        for dto in proposal.map(|p| p.items).unwrap_or_default() {
            let word = dto.word.clone();
            match dto.into_candidate() {
                Some(candidate) => candidates.push(candidate),
                None => warnings.push(
                    QualityWarning::CandidateRejected {
                        word,
                        reason: "unknown category".to_string(),
                    }
                    .raise(),
                ),
            }
        }

        let validator = GroundingValidator::new(ctx.params.max_sentence_words);
        let outcome = validator.validate(&candidates, ctx.source, &ctx.params.quota, &ctx.excluded);
        warnings.extend(outcome.warnings);
        note_partial(Phase::Flashcards, ctx.params.quota.total(), outcome.items.len(), warnings);
        outcome.items
    }

    async fn multiple_choice_phase(
        &self,
        ctx: &PhaseContext<'_>,
        warnings: &mut Vec<QualityWarning>,
        rng: &mut StdRng,
    ) -> AppResult<Vec<MultipleChoiceQuestion>> {
        let wanted = ctx.params.item_count_per_phase;
        let instructions = instructions(
            MULTIPLE_CHOICE_INSTRUCTIONS,
            ctx,
            schema_json::<MultipleChoiceProposal>(),
        );
        let proposal: Option<MultipleChoiceProposal> =
            self.propose(ctx.step, &instructions, warnings).await;

        let mut used = ctx.excluded.clone();
        let mut questions = Vec::new();
        for dto in proposal.map(|p| p.questions).unwrap_or_default() {
            if questions.len() >= wanted {
                break;
            }
            let grounded =
                item_builders::generated_question(&dto, ctx.source, ctx.params, &used, warnings, rng)?;
            if let Some(question) = grounded {
                remember(&mut used, &question);
                questions.push(question);
            }
        }

        if questions.len() < wanted {
            let extractor = FallbackExtractor::new(ctx.params.max_sentence_words);
            let pool = item_builders::fallback_pool(&extractor, ctx.source, &ctx.params.quota, &used);
            let picked = item_builders::pick_by_quota(&pool, &ctx.params.quota, wanted - questions.len());
            for item in picked {
                let distractors = item_builders::surfaces_of(&pool, item.category());
                let question = item_builders::gap_question(
                    &item,
                    &distractors,
                    ctx.source,
                    ctx.params,
                    warnings,
                    rng,
                )?;
                questions.push(question);
            }
        }

        note_partial(Phase::MultipleChoice, wanted, questions.len(), warnings);
        Ok(questions)
    }

    async fn fill_in_blank_phase(
        &self,
        ctx: &PhaseContext<'_>,
        warnings: &mut Vec<QualityWarning>,
        rng: &mut StdRng,
    ) -> AppResult<Vec<BlankQuestion>> {
        let wanted = ctx.params.item_count_per_phase;
        let instructions = instructions(
            FILL_IN_BLANK_INSTRUCTIONS,
            ctx,
            schema_json::<FillInBlankProposal>(),
        );
        let proposal: Option<FillInBlankProposal> =
            self.propose(ctx.step, &instructions, warnings).await;

        let mut used = ctx.excluded.clone();
        let mut used_sentences: Vec<Span> = Vec::new();
        let mut blanks = Vec::new();
        for dto in proposal.map(|p| p.items).unwrap_or_default() {
            if blanks.len() >= wanted {
                break;
            }
            let grounded =
                item_builders::generated_blank(&dto, ctx.source, ctx.params, &used, warnings, rng)?;
            let Some(blank) = grounded else {
                continue;
            };
            if overlaps_any(&used_sentences, blank.sentence_span) {
                continue;
            }
            remember(&mut used, &blank);
            used_sentences.push(blank.sentence_span);
            blanks.push(blank);
        }

        if blanks.len() < wanted {
            let extractor = FallbackExtractor::new(ctx.params.max_sentence_words);
            let pool = item_builders::fallback_pool(&extractor, ctx.source, &ctx.params.quota, &used);

            // A word whose first sentence is taken can still be blanked in a later one.
            let mut by_sentence: BTreeMap<Span, Vec<(Span, &ValidatedItem)>> = BTreeMap::new();
            for item in pool.values().flatten() {
                for word in FallbackExtractor::occurrences(ctx.source, item) {
                    if let Some(sentence) = ctx.source.sentence_containing(word) {
                        by_sentence.entry(sentence).or_default().push((word, item));
                    }
                }
            }

            for (sentence, mut items) in by_sentence {
                if blanks.len() >= wanted {
                    break;
                }
                if overlaps_any(&used_sentences, sentence) {
                    continue;
                }
                items.sort_by_key(|(word, _)| *word);

                let mut answers: Vec<Span> = Vec::new();
                let mut category = None;
                for (word, item) in &items {
                    if answers.len() >= ctx.params.blank_count {
                        break;
                    }
                    if used.contains(&item.surface) || overlaps_any(&answers, *word) {
                        continue;
                    }
                    used.insert(&item.surface);
                    category.get_or_insert(item.category());
                    answers.push(*word);
                }
                let Some(category) = category else {
                    continue;
                };

                let distractors = item_builders::surfaces_of(&pool, category);
                let mut blank = item_builders::blank_question(
                    ctx.source,
                    sentence,
                    &answers,
                    &distractors,
                    Some(category),
                    ctx.params,
                    warnings,
                    rng,
                )?;
                if blank.sentence_span == sentence {
                    blank.sentence_translation = items
                        .iter()
                        .find_map(|(_, item)| item.candidate.usage_translation.clone());
                }
                remember(&mut used, &blank);
                used_sentences.push(sentence);
                blanks.push(blank);
            }
        }

        note_partial(Phase::FillInBlank, wanted, blanks.len(), warnings);
        Ok(blanks)
    }

    /// Asks the generator for a proposal. A phase whose generation fails or returns
    /// something unparseable carries on with fallback content only.
    async fn propose<T: DeserializeOwned>(
        &self,
        step: &PhaseStep,
        instructions: &str,
        warnings: &mut Vec<QualityWarning>,
    ) -> Option<T> {
        let policy = step.policy(&self.policy);
        let outcome = match generate_with_retry(self.generator.as_ref(), instructions, &policy).await {
            Ok(raw) => parse_proposal::<T>(&raw),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(proposal) => Some(proposal),
            Err(err) => {
                log::error!("{} failed, using fallback content: {}", step.name, err);
                warnings.push(
                    QualityWarning::PhaseDegraded {
                        phase: step.phase,
                        reason: err.to_string(),
                    }
                    .raise(),
                );
                None
            }
        }
    }
}

fn instructions(template: &str, ctx: &PhaseContext<'_>, schema: String) -> String {
    let params = ctx.params;
    let count = params.item_count_per_phase.to_string();
    let band = ctx.profile.band.to_string();
    let complexity = format!("{:?}", params.complexity).to_lowercase();
    let quota = params
        .quota
        .0
        .iter()
        .map(|(category, n)| format!("{} {}", n, category))
        .collect::<Vec<_>>()
        .join(", ");

    let mut interests = ctx.profile.interests.join(", ");
    if let Some(field) = ctx.profile.study_field.as_deref().filter(|f| !f.trim().is_empty()) {
        interests.push_str(&format!(" (studies {})", field.trim()));
    }

    let excluded = if ctx.excluded.is_empty() {
        "(none)".to_string()
    } else {
        ctx.excluded.terms().iter().cloned().collect::<Vec<_>>().join(", ")
    };
    let distractors = params.choice_count.saturating_sub(1).to_string();
    let blanks = params.blank_count.to_string();

    fill_template(
        template,
        &[
            ("count", &count),
            ("band", &band),
            ("complexity", &complexity),
            ("quota", &quota),
            ("interests", &interests),
            ("excluded", &excluded),
            ("distractors", &distractors),
            ("blanks", &blanks),
            ("source", ctx.source.as_str()),
            ("schema", &schema),
        ],
    )
}

/// Same source and key, same choice order.
fn seeded_rng(source: &SourceText, key: &EvaluationKey) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(source.content_hash().as_bytes());
    hasher.update(key.to_string().as_bytes());
    let seed: [u8; 32] = hasher.finalize().into();
    StdRng::from_seed(seed)
}

fn ensure_not_cancelled(flag: &CancellationFlag, key: &EvaluationKey) -> AppResult<()> {
    if flag.is_cancelled() {
        return Err(AppError::Cancelled(format!("run for {} was cancelled", key)));
    }
    Ok(())
}

fn remember<T: Fingerprinted>(used: &mut FingerprintSet, item: &T) {
    for term in item.fingerprint_terms() {
        used.insert(&term);
    }
}

fn overlaps_any(spans: &[Span], span: Span) -> bool {
    spans.iter().any(|s| s.start < span.end && span.start < s.end)
}

fn note_partial(phase: Phase, requested: usize, produced: usize, warnings: &mut Vec<QualityWarning>) {
    if produced < requested {
        warnings.push(
            QualityWarning::PartialPhase {
                phase,
                requested,
                produced,
            }
            .raise(),
        );
    }
}
