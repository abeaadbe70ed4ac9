use async_trait::async_trait;
use mongodb::{bson::doc, Collection};
use serde::{Deserialize, Serialize};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{LearnerProfile, SourceDocument},
};

/// Read-only access to source texts and stored learner profiles.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn find_source(&self, source_id: &str) -> AppResult<SourceDocument>;
    async fn find_profile(&self, personalization_id: &str) -> AppResult<Option<LearnerProfile>>;
}

/// Shape of a document in the profiles collection.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoredProfile {
    pub personalization_id: String,
    #[serde(flatten)]
    pub profile: LearnerProfile,
}

pub struct MongoSourceProvider {
    sources: Collection<SourceDocument>,
    profiles: Collection<StoredProfile>,
}

impl MongoSourceProvider {
    pub fn new(db: &Database, sources_collection: &str, profiles_collection: &str) -> Self {
        Self {
            sources: db.get_collection(sources_collection),
            profiles: db.get_collection(profiles_collection),
        }
    }
}

#[async_trait]
impl SourceProvider for MongoSourceProvider {
    async fn find_source(&self, source_id: &str) -> AppResult<SourceDocument> {
        self.sources
            .find_one(doc! { "id": source_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Source {} not found", source_id)))
    }

    async fn find_profile(&self, personalization_id: &str) -> AppResult<Option<LearnerProfile>> {
        let stored = self
            .profiles
            .find_one(doc! { "personalization_id": personalization_id })
            .await?;
        Ok(stored.map(|s| s.profile))
    }
}
