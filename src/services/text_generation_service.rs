use std::time::Duration;

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use crate::{
    config::Config,
    constants::prompts::EVALUATION_SYSTEM_PROMPT,
    errors::{AppError, AppResult},
};

/// Free-text generation backend. Output is untrusted and parsed by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate(&self, instructions: &str) -> AppResult<String>;
}

/// Chat-completion adapter over the OpenAI API, asking for a JSON object reply.
pub struct OpenAiTextGenerationService {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTextGenerationService {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.openai_api_key.expose_secret())
            .with_api_base(&config.openai_api_base);
        Self {
            client: Client::with_config(openai_config),
            model: config.generation_model.clone(),
        }
    }
}

#[async_trait]
impl TextGenerationService for OpenAiTextGenerationService {
    async fn generate(&self, instructions: &str) -> AppResult<String> {
        let request = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": EVALUATION_SYSTEM_PROMPT },
                { "role": "user", "content": instructions },
            ],
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
        });

        let started = std::time::Instant::now();
        let response: Value = self
            .client
            .chat()
            .create_byot(request)
            .await
            .map_err(|e| AppError::GenerationUnavailable(e.to_string()))?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::GenerationUnavailable("completion returned no content".to_string())
            })?;

        log::info!(
            "generation with {} took {} ms, {} bytes returned",
            self.model,
            started.elapsed().as_millis(),
            content.len()
        );
        Ok(content.to_string())
    }
}

/// How long to wait for one generation call and how often to try again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Sleep before retry `n` is `n * backoff`.
    pub backoff: Duration,
}

impl GenerationPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.generation_timeout(), config.generation_max_retries)
    }
}

/// Calls `service` under `policy`. Timeouts and `GenerationUnavailable` are retried; any
/// other error is returned at once. After the last attempt the failure is reported as
/// `GenerationUnavailable`.
pub async fn generate_with_retry(
    service: &dyn TextGenerationService,
    instructions: &str,
    policy: &GenerationPolicy,
) -> AppResult<String> {
    let attempts = policy.max_retries + 1;
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match tokio::time::timeout(policy.timeout, service.generate(instructions)).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(err)) if err.is_transient() => {
                log::warn!("generation attempt {}/{} failed: {}", attempt, attempts, err);
                last_error = err.to_string();
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                log::warn!(
                    "generation attempt {}/{} timed out after {:?}",
                    attempt,
                    attempts,
                    policy.timeout
                );
                last_error = format!("timed out after {:?}", policy.timeout);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.backoff * attempt).await;
        }
    }

    Err(AppError::GenerationUnavailable(format!(
        "gave up after {} attempt(s): {}",
        attempts, last_error
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn fast_policy(max_retries: u32) -> GenerationPolicy {
        GenerationPolicy::new(Duration::from_millis(50), max_retries).with_backoff(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_returns_first_success() {
        let mut mock = MockTextGenerationService::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Ok("{\"items\": []}".to_string()));

        let out = generate_with_retry(&mock, "go", &fast_policy(2)).await.unwrap();
        assert_eq!(out, "{\"items\": []}");
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockTextGenerationService::new();
        mock.expect_generate().times(3).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::GenerationUnavailable("rate limited".into()))
            } else {
                Ok("ok".to_string())
            }
        });

        let out = generate_with_retry(&mock, "go", &fast_policy(2)).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mut mock = MockTextGenerationService::new();
        mock.expect_generate()
            .times(2)
            .returning(|_| Err(AppError::GenerationUnavailable("down".into())));

        let err = generate_with_retry(&mock, "go", &fast_policy(1)).await.unwrap_err();
        assert!(matches!(err, AppError::GenerationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_transient_errors_are_not_retried() {
        let mut mock = MockTextGenerationService::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Err(AppError::ValidationError("bad instructions".into())));

        let err = generate_with_retry(&mock, "go", &fast_policy(3)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerationService for SlowGenerator {
        async fn generate(&self, _instructions: &str) -> AppResult<String> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test]
    async fn test_timeouts_count_as_unavailable() {
        let policy = GenerationPolicy::new(Duration::from_millis(10), 1).with_backoff(Duration::ZERO);
        let err = generate_with_retry(&SlowGenerator, "go", &policy).await.unwrap_err();
        match err {
            AppError::GenerationUnavailable(message) => assert!(message.contains("timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
