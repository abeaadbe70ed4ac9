use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{EvaluationDocument, EvaluationKey, LearnerProfile},
    repositories::{EvaluationRepository, SourceProvider},
    services::{
        evaluation_pipeline::{
            CancellationFlag, EvaluationPipeline, RunLifecycle, RunRequest, RunState,
        },
        persistence_gate::{KeyedLocks, PersistenceGate},
        text_generation_service::{GenerationPolicy, TextGenerationService},
    },
};

pub struct EvaluationService {
    sources: Arc<dyn SourceProvider>,
    repository: Arc<dyn EvaluationRepository>,
    pipeline: EvaluationPipeline,
    gate: PersistenceGate,
    runs: KeyedLocks,
}

impl EvaluationService {
    pub fn new(
        sources: Arc<dyn SourceProvider>,
        repository: Arc<dyn EvaluationRepository>,
        generator: Arc<dyn TextGenerationService>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            sources,
            gate: PersistenceGate::new(repository.clone()),
            repository,
            pipeline: EvaluationPipeline::new(generator, policy),
            runs: KeyedLocks::new(),
        }
    }

    pub async fn generate_evaluation(
        &self,
        source_id: &str,
        personalization_id: &str,
        profile: Option<LearnerProfile>,
    ) -> AppResult<EvaluationDocument> {
        self.generate_cancellable(source_id, personalization_id, profile, &CancellationFlag::new())
            .await
    }

    /// Generates and commits a fresh evaluation for the key, replacing the previous one.
    /// Nothing is written unless the whole run succeeds. Runs for the same key wait for
    /// each other.
    pub async fn generate_cancellable(
        &self,
        source_id: &str,
        personalization_id: &str,
        profile: Option<LearnerProfile>,
        cancellation: &CancellationFlag,
    ) -> AppResult<EvaluationDocument> {
        let key = EvaluationKey::new(source_id, personalization_id);
        let profile = self.resolve_profile(&key, profile).await?;
        let source = self.sources.find_source(source_id).await?.source_text();

        let _run = self.runs.lock(&key).await;
        let mut lifecycle = RunLifecycle::new(key.clone());

        let generated = self
            .pipeline
            .run(
                RunRequest {
                    key: &key,
                    source: &source,
                    profile: &profile,
                    cancellation,
                },
                &mut lifecycle,
            )
            .await;
        let document = match generated {
            Ok(document) => document,
            Err(err) => {
                lifecycle.reject(&err);
                return Err(err);
            }
        };

        let committed = match self.gate.replace(document).await {
            Ok(committed) => committed,
            Err(err) => {
                lifecycle.reject(&err);
                return Err(err);
            }
        };
        lifecycle.advance(RunState::Committed)?;

        log::info!(
            "evaluation {} for {}: {} flashcard(s), {} question(s), {} blank item(s), {} warning(s)",
            committed.id,
            key,
            committed.flashcards.len(),
            committed.multiple_choice.len(),
            committed.fill_in_blank.len(),
            committed.warnings.len()
        );
        Ok(committed)
    }

    pub async fn get_evaluation(
        &self,
        source_id: &str,
        personalization_id: Option<&str>,
    ) -> AppResult<EvaluationDocument> {
        self.repository
            .find_latest(source_id, personalization_id)
            .await?
            .ok_or_else(|| match personalization_id {
                Some(p) => AppError::NotFound(format!(
                    "No evaluation for source '{}' and personalization '{}'",
                    source_id, p
                )),
                None => AppError::NotFound(format!("No evaluation for source '{}'", source_id)),
            })
    }

    /// The request's profile wins over the stored one.
    async fn resolve_profile(
        &self,
        key: &EvaluationKey,
        profile: Option<LearnerProfile>,
    ) -> AppResult<LearnerProfile> {
        let profile = match profile {
            Some(profile) => profile,
            None => self
                .sources
                .find_profile(&key.personalization_id)
                .await?
                .ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "no profile given and none stored for personalization '{}'",
                        key.personalization_id
                    ))
                })?,
        };
        profile.ensure_valid()?;
        Ok(profile)
    }
}
