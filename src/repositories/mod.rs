pub mod evaluation_repository;
pub mod source_repository;

pub use evaluation_repository::{EvaluationRepository, MongoEvaluationRepository};
pub use source_repository::{MongoSourceProvider, SourceProvider, StoredProfile};
