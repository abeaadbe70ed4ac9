use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{MongoEvaluationRepository, MongoSourceProvider},
    services::{
        evaluation_service::EvaluationService,
        text_generation_service::{GenerationPolicy, OpenAiTextGenerationService},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub evaluation_service: Arc<EvaluationService>,
    /// `None` when the service runs on stores that need no connection.
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let evaluation_repository = Arc::new(MongoEvaluationRepository::new(
            &db,
            &config.evaluations_collection,
        ));
        evaluation_repository.ensure_indexes().await?;

        let sources = Arc::new(MongoSourceProvider::new(
            &db,
            &config.sources_collection,
            &config.profiles_collection,
        ));
        let generator = Arc::new(OpenAiTextGenerationService::new(&config));
        let evaluation_service = Arc::new(EvaluationService::new(
            sources,
            evaluation_repository,
            generator,
            GenerationPolicy::from_config(&config),
        ));

        Ok(Self {
            evaluation_service,
            db: Some(db),
            config: Arc::new(config),
        })
    }

    pub fn with_service(evaluation_service: Arc<EvaluationService>, config: Config) -> Self {
        Self {
            evaluation_service,
            db: None,
            config: Arc::new(config),
        }
    }
}
