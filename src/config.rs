use std::env;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub evaluations_collection: String,
    pub sources_collection: String,
    pub profiles_collection: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub openai_api_key: SecretString,
    pub openai_api_base: String,
    pub generation_model: String,
    pub generation_timeout_seconds: u64,
    pub generation_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "evaluations-local".to_string()),
            evaluations_collection: env::var("EVALUATIONS_COLLECTION")
                .unwrap_or_else(|_| "evaluations".to_string()),
            sources_collection: env::var("SOURCES_COLLECTION")
                .unwrap_or_else(|_| "sources".to_string()),
            profiles_collection: env::var("PROFILES_COLLECTION")
                .unwrap_or_else(|_| "learner_profiles".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            openai_api_key: SecretString::from(
                env::var("OPENAI_API_KEY").unwrap_or_default(),
            ),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            generation_model: env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            generation_timeout_seconds: env::var("GENERATION_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            generation_max_retries: env::var("GENERATION_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_seconds)
    }

    /// Validate that production-critical configuration is set
    /// Panics if the generation capability has no credentials
    pub fn validate_for_production(&self) {
        if self.openai_api_key.expose_secret().trim().is_empty() {
            panic!(
                "FATAL: OPENAI_API_KEY is not set! The evaluation pipeline needs a text generation backend."
            );
        }

        if self.generation_timeout_seconds == 0 {
            panic!("FATAL: GENERATION_TIMEOUT_SECONDS must be greater than zero.");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "evaluations-test".to_string(),
            evaluations_collection: "evaluations".to_string(),
            sources_collection: "sources".to_string(),
            profiles_collection: "learner_profiles".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            openai_api_key: SecretString::from("test-key".to_string()),
            openai_api_base: "http://localhost:9999/v1".to_string(),
            generation_model: "test-model".to_string(),
            generation_timeout_seconds: 5,
            generation_max_retries: 1,
        }
    }
}
