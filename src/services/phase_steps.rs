use std::time::Duration;

use crate::{models::domain::Phase, services::text_generation_service::GenerationPolicy};

const FLASHCARD_TIMEOUT: u64 = 60;
const MULTIPLE_CHOICE_TIMEOUT: u64 = 90;
const FILL_IN_BLANK_TIMEOUT: u64 = 90;

const DEFAULT_RETRIES: u32 = 2;
const FILL_IN_BLANK_RETRIES: u32 = 1;

/// One generation phase of an evaluation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStep {
    pub phase: Phase,
    pub name: String,
    pub description: Option<String>,
    pub max_retries: u32,
    pub timeout_seconds: Option<u64>,
    pub mandatory: bool,
}

impl PhaseStep {
    pub fn new(phase: Phase, name: impl Into<String>) -> Self {
        Self {
            phase,
            name: name.into(),
            description: None,
            max_retries: DEFAULT_RETRIES,
            timeout_seconds: None,
            mandatory: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// The step's own limits, capped by the configured ones.
    pub fn policy(&self, configured: &GenerationPolicy) -> GenerationPolicy {
        let timeout = self
            .timeout_seconds
            .map(Duration::from_secs)
            .map_or(configured.timeout, |t| t.min(configured.timeout));
        GenerationPolicy {
            timeout,
            max_retries: self.max_retries.min(configured.max_retries),
            backoff: configured.backoff,
        }
    }
}

pub fn create_evaluation_steps() -> Vec<PhaseStep> {
    vec![flashcards_step(), multiple_choice_step(), fill_in_blank_step()]
}

fn flashcards_step() -> PhaseStep {
    PhaseStep::new(Phase::Flashcards, "generate_flashcards")
        .with_description("Propose vocabulary items with their usage sentences from the source text")
        .with_max_retries(DEFAULT_RETRIES)
        .with_timeout(FLASHCARD_TIMEOUT)
}

fn multiple_choice_step() -> PhaseStep {
    PhaseStep::new(Phase::MultipleChoice, "generate_multiple_choice")
        .with_description("Propose multiple-choice questions about words not used by the flashcards")
        .with_max_retries(DEFAULT_RETRIES)
        .with_timeout(MULTIPLE_CHOICE_TIMEOUT)
}

fn fill_in_blank_step() -> PhaseStep {
    PhaseStep::new(Phase::FillInBlank, "generate_fill_in_blank")
        .with_description("Propose source sentences and the words to blank out in them")
        .with_max_retries(FILL_IN_BLANK_RETRIES)
        .with_timeout(FILL_IN_BLANK_TIMEOUT)
}
