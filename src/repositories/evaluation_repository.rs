use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{EvaluationDocument, EvaluationKey},
};

/// Store for committed evaluations. At most one document per key is expected; inserting
/// a second one for the same key fails with `AppError::AlreadyExists`.
#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    async fn insert(&self, document: &EvaluationDocument) -> AppResult<()>;
    /// Returns how many documents were removed.
    async fn delete_by_key(&self, key: &EvaluationKey) -> AppResult<u64>;
    async fn find_by_key(&self, key: &EvaluationKey) -> AppResult<Option<EvaluationDocument>>;
    /// Most recently committed document for the source, optionally for one personalization.
    async fn find_latest(
        &self,
        source_id: &str,
        personalization_id: Option<&str>,
    ) -> AppResult<Option<EvaluationDocument>>;
    async fn count_by_key(&self, key: &EvaluationKey) -> AppResult<u64>;
}

pub struct MongoEvaluationRepository {
    collection: Collection<EvaluationDocument>,
}

impl MongoEvaluationRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for evaluations collection");

        let key_index = IndexModel::builder()
            .keys(doc! { "source_id": 1, "personalization_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("source_personalization_unique".to_string())
                    .build(),
            )
            .build();

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(key_index).await?;
        self.collection.create_index(id_index).await?;

        log::info!("Successfully created indexes for evaluations collection");
        Ok(())
    }
}

#[async_trait]
impl EvaluationRepository for MongoEvaluationRepository {
    async fn insert(&self, document: &EvaluationDocument) -> AppResult<()> {
        self.collection.insert_one(document).await?;
        Ok(())
    }

    async fn delete_by_key(&self, key: &EvaluationKey) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! {
                "source_id": &key.source_id,
                "personalization_id": &key.personalization_id,
            })
            .await?;
        Ok(result.deleted_count)
    }

    async fn find_by_key(&self, key: &EvaluationKey) -> AppResult<Option<EvaluationDocument>> {
        let document = self
            .collection
            .find_one(doc! {
                "source_id": &key.source_id,
                "personalization_id": &key.personalization_id,
            })
            .await?;
        Ok(document)
    }

    async fn find_latest(
        &self,
        source_id: &str,
        personalization_id: Option<&str>,
    ) -> AppResult<Option<EvaluationDocument>> {
        let filter = match personalization_id {
            Some(personalization_id) => doc! {
                "source_id": source_id,
                "personalization_id": personalization_id,
            },
            None => doc! { "source_id": source_id },
        };

        // committed_at is stored as an RFC 3339 string, so order in memory rather than
        // trusting a lexical sort.
        let cursor = self.collection.find(filter).await?;
        let documents: Vec<EvaluationDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().max_by_key(|d| d.committed_at))
    }

    async fn count_by_key(&self, key: &EvaluationKey) -> AppResult<u64> {
        let count = self
            .collection
            .count_documents(doc! {
                "source_id": &key.source_id,
                "personalization_id": &key.personalization_id,
            })
            .await?;
        Ok(count)
    }
}
