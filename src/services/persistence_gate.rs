use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{EvaluationDocument, EvaluationKey},
    repositories::EvaluationRepository,
};

/// One async mutex per evaluation key.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<EvaluationKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `key`.
    pub async fn lock(&self, key: &EvaluationKey) -> OwnedMutexGuard<()> {
        self.entry(key).await.lock_owned().await
    }

    /// `None` when `key` is already held.
    pub async fn try_lock(&self, key: &EvaluationKey) -> Option<OwnedMutexGuard<()>> {
        self.entry(key).await.try_lock_owned().ok()
    }

    async fn entry(&self, key: &EvaluationKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // Nobody outside the map holds these any more.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key.clone()).or_default().clone()
    }
}

/// Replaces the live evaluation for a key, so the store never holds two for the same
/// source and personalization.
pub struct PersistenceGate {
    repository: Arc<dyn EvaluationRepository>,
    locks: KeyedLocks,
}

impl PersistenceGate {
    pub fn new(repository: Arc<dyn EvaluationRepository>) -> Self {
        Self {
            repository,
            locks: KeyedLocks::new(),
        }
    }

    /// Deletes whatever is stored for the document's key and inserts the document. A
    /// uniqueness conflict is retried once; a second one is a
    /// `ConcurrentRegenerationConflict`. Any other insert failure puts the previous
    /// document back before the error is returned.
    pub async fn replace(&self, mut document: EvaluationDocument) -> AppResult<EvaluationDocument> {
        let key = document.key();
        let _guard = self.locks.lock(&key).await;

        let previous = self.repository.find_by_key(&key).await?;
        document.committed_at = Utc::now();

        let mut conflict = String::new();
        for attempt in 1..=2 {
            let removed = self.repository.delete_by_key(&key).await?;
            log::debug!("removed {} prior evaluation(s) for {}", removed, key);

            match self.repository.insert(&document).await {
                Ok(()) => {
                    log::info!(
                        "committed evaluation {} for {} (attempt {})",
                        document.id,
                        key,
                        attempt
                    );
                    return Ok(document);
                }
                Err(AppError::AlreadyExists(message)) => {
                    log::warn!(
                        "uniqueness conflict committing {} (attempt {}): {}",
                        key,
                        attempt,
                        message
                    );
                    conflict = message;
                }
                Err(err) => {
                    log::error!("failed to commit evaluation for {}: {}", key, err);
                    self.restore(&key, previous).await;
                    return Err(err);
                }
            }
        }

        Err(AppError::ConcurrentRegenerationConflict(format!(
            "{} was written concurrently twice: {}",
            key, conflict
        )))
    }

    async fn restore(&self, key: &EvaluationKey, previous: Option<EvaluationDocument>) {
        let Some(previous) = previous else {
            return;
        };
        if self.repository.count_by_key(key).await.unwrap_or(0) > 0 {
            return;
        }
        match self.repository.insert(&previous).await {
            Ok(()) => log::info!("restored previous evaluation {} for {}", previous.id, key),
            Err(err) => log::error!("could not restore previous evaluation for {}: {}", key, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fixtures::evaluation_document, test_helpers::InMemoryEvaluationRepository};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_replace_keeps_one_document_per_key() {
        let repository = Arc::new(InMemoryEvaluationRepository::new());
        let gate = PersistenceGate::new(repository.clone());

        let first = gate.replace(evaluation_document("src-1", "learner-1")).await.unwrap();
        let second = gate.replace(evaluation_document("src-1", "learner-1")).await.unwrap();

        let key = EvaluationKey::new("src-1", "learner-1");
        assert_eq!(repository.count_by_key(&key).await.unwrap(), 1);
        let stored = repository.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(stored.id, second.id);
        assert_ne!(stored.id, first.id);
    }

    #[tokio::test]
    async fn test_single_conflict_is_retried() {
        let repository = Arc::new(InMemoryEvaluationRepository::new());
        repository.conflicts_to_inject.store(1, Ordering::SeqCst);
        let gate = PersistenceGate::new(repository.clone());

        gate.replace(evaluation_document("src-1", "learner-1")).await.unwrap();
        let key = EvaluationKey::new("src-1", "learner-1");
        assert_eq!(repository.count_by_key(&key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_conflict_is_fatal() {
        let repository = Arc::new(InMemoryEvaluationRepository::new());
        repository.conflicts_to_inject.store(2, Ordering::SeqCst);
        let gate = PersistenceGate::new(repository);

        let err = gate
            .replace(evaluation_document("src-1", "learner-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrentRegenerationConflict(_)));
    }

    #[tokio::test]
    async fn test_failed_insert_restores_previous_document() {
        let repository = Arc::new(InMemoryEvaluationRepository::new());
        let gate = PersistenceGate::new(repository.clone());
        let original = gate.replace(evaluation_document("src-1", "learner-1")).await.unwrap();

        repository.fail_inserts.store(1, Ordering::SeqCst);
        let err = gate
            .replace(evaluation_document("src-1", "learner-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));

        let key = EvaluationKey::new("src-1", "learner-1");
        let stored = repository.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(stored.id, original.id);
    }

    #[tokio::test]
    async fn test_keyed_locks_are_per_key() {
        let locks = KeyedLocks::new();
        let a = EvaluationKey::new("src-1", "learner-1");
        let b = EvaluationKey::new("src-1", "learner-2");

        let held = locks.lock(&a).await;
        assert!(locks.try_lock(&a).await.is_none());
        assert!(locks.try_lock(&b).await.is_some());
        drop(held);
        assert!(locks.try_lock(&a).await.is_some());
    }
}
