#[cfg(test)]
pub mod fixtures {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::{
        models::domain::{
            Category, EvaluationDocument, Flashcard, ItemOrigin, LearnerProfile, LearningGoal,
            ProficiencyBand, SourceDocument, Span,
        },
        services::level_config::LevelConfigResolver,
    };

    pub const SAMPLE_TEXT: &str = "Der Hund läuft schnell durch den Park. \
        Die Katze schläft auf dem warmen Sofa. Das Kind spielt mit dem roten Ball. \
        Der Vater kocht heute eine leckere Suppe. Die Mutter liest ein spannendes Buch. \
        Am Abend geht die Familie in den Garten.";

    /// A short German text with enough nouns, verbs and adjectives for every phase.
    pub fn sample_source(id: &str) -> SourceDocument {
        SourceDocument::new(id, "Ein Tag zu Hause", SAMPLE_TEXT)
    }

    pub fn sample_profile() -> LearnerProfile {
        LearnerProfile::new(ProficiencyBand::B1, LearningGoal::General, &["Tiere", "Familie"])
    }

    /// Minimal committed-looking document with a fresh id.
    pub fn evaluation_document(source_id: &str, personalization_id: &str) -> EvaluationDocument {
        let profile = sample_profile();
        EvaluationDocument {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            personalization_id: personalization_id.to_string(),
            source_hash: "0".repeat(64),
            band: profile.band,
            parameters: LevelConfigResolver::parameters_for(profile.band, profile.goal, None),
            flashcards: vec![Flashcard {
                id: "fc-1".to_string(),
                front: "der Hund".to_string(),
                surface: "Hund".to_string(),
                category: Category::Noun,
                article: Some("der".to_string()),
                translation: Some("dog".to_string()),
                sentence: "Der Hund läuft schnell durch den Park.".to_string(),
                sentence_translation: None,
                word_span: Span::new(4, 8),
                sentence_span: Span::new(0, 39),
                origin: ItemOrigin::Generated,
            }],
            multiple_choice: Vec::new(),
            fill_in_blank: Vec::new(),
            warnings: Vec::new(),
            committed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use actix_web::http::StatusCode;
    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use crate::{
        errors::{AppError, AppResult},
        models::domain::{EvaluationDocument, EvaluationKey, LearnerProfile, SourceDocument},
        repositories::{EvaluationRepository, SourceProvider},
    };

    /// Keyed in-memory store with the same uniqueness rule as the Mongo index. Failures
    /// can be injected: each counter fails that many inserts before inserts succeed again.
    #[derive(Default)]
    pub struct InMemoryEvaluationRepository {
        documents: RwLock<HashMap<EvaluationKey, EvaluationDocument>>,
        pub conflicts_to_inject: AtomicUsize,
        pub fail_inserts: AtomicUsize,
    }

    impl InMemoryEvaluationRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl EvaluationRepository for InMemoryEvaluationRepository {
        async fn insert(&self, document: &EvaluationDocument) -> AppResult<()> {
            if take_one(&self.conflicts_to_inject) {
                return Err(AppError::AlreadyExists(format!(
                    "E11000 duplicate key for {}",
                    document.key()
                )));
            }
            if take_one(&self.fail_inserts) {
                return Err(AppError::DatabaseError("connection reset".to_string()));
            }

            let mut documents = self.documents.write().await;
            let key = document.key();
            if documents.contains_key(&key) {
                return Err(AppError::AlreadyExists(format!("E11000 duplicate key for {}", key)));
            }
            documents.insert(key, document.clone());
            Ok(())
        }

        async fn delete_by_key(&self, key: &EvaluationKey) -> AppResult<u64> {
            Ok(self.documents.write().await.remove(key).map_or(0, |_| 1))
        }

        async fn find_by_key(&self, key: &EvaluationKey) -> AppResult<Option<EvaluationDocument>> {
            Ok(self.documents.read().await.get(key).cloned())
        }

        async fn find_latest(
            &self,
            source_id: &str,
            personalization_id: Option<&str>,
        ) -> AppResult<Option<EvaluationDocument>> {
            let documents = self.documents.read().await;
            Ok(documents
                .values()
                .filter(|d| d.source_id == source_id)
                .filter(|d| personalization_id.map_or(true, |p| d.personalization_id == p))
                .max_by_key(|d| d.committed_at)
                .cloned())
        }

        async fn count_by_key(&self, key: &EvaluationKey) -> AppResult<u64> {
            Ok(self.documents.read().await.contains_key(key) as u64)
        }
    }

    #[derive(Default)]
    pub struct InMemorySourceProvider {
        sources: RwLock<HashMap<String, SourceDocument>>,
        profiles: RwLock<HashMap<String, LearnerProfile>>,
    }

    impl InMemorySourceProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn add_source(&self, source: SourceDocument) {
            self.sources.write().await.insert(source.id.clone(), source);
        }

        pub async fn add_profile(&self, personalization_id: &str, profile: LearnerProfile) {
            self.profiles
                .write()
                .await
                .insert(personalization_id.to_string(), profile);
        }
    }

    #[async_trait]
    impl SourceProvider for InMemorySourceProvider {
        async fn find_source(&self, source_id: &str) -> AppResult<SourceDocument> {
            self.sources
                .read()
                .await
                .get(source_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Source {} not found", source_id)))
        }

        async fn find_profile(&self, personalization_id: &str) -> AppResult<Option<LearnerProfile>> {
            Ok(self.profiles.read().await.get(personalization_id).cloned())
        }
    }

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::test_helpers::*;
    use crate::{
        errors::AppError,
        models::domain::EvaluationKey,
        repositories::{EvaluationRepository, SourceProvider},
    };
    use std::sync::atomic::Ordering;

    #[test]
    fn test_fixture_spans_point_into_the_sample() {
        let source = sample_source("src-1").source_text();
        let document = evaluation_document("src-1", "learner-1");
        let card = &document.flashcards[0];
        assert_eq!(source.slice(card.word_span), card.surface);
        assert_eq!(source.slice(card.sentence_span), card.sentence);
    }

    #[tokio::test]
    async fn test_in_memory_repository_enforces_one_document_per_key() {
        let repository = InMemoryEvaluationRepository::new();
        repository
            .insert(&evaluation_document("src-1", "learner-1"))
            .await
            .unwrap();
        let err = repository
            .insert(&evaluation_document("src-1", "learner-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));

        repository.conflicts_to_inject.store(1, Ordering::SeqCst);
        let err = repository
            .insert(&evaluation_document("src-1", "learner-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
        repository
            .insert(&evaluation_document("src-1", "learner-2"))
            .await
            .unwrap();

        let key = EvaluationKey::new("src-1", "learner-2");
        assert_eq!(repository.delete_by_key(&key).await.unwrap(), 1);
        assert_eq!(repository.count_by_key(&key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_source_provider() {
        let provider = InMemorySourceProvider::new();
        provider.add_source(sample_source("src-1")).await;

        assert!(provider.find_source("src-1").await.is_ok());
        assert!(matches!(
            provider.find_source("nope").await,
            Err(AppError::NotFound(_))
        ));
        assert!(provider.find_profile("learner-1").await.unwrap().is_none());
    }
}
