//! Generative-model seam: the trait the engine talks to, its `edgequake-llm`
//! implementation, and the call wrapper with timeout and retry.
//!
//! All prompt text lives in [`crate::prompts`]; this module only moves
//! messages to the model and text back.
//!
//! ## Retry Strategy
//!
//! Each call is bounded by `api_timeout_secs`. A timeout or a transient
//! transport error (network, rate limit, server error) gets at most one more
//! attempt after `retry_backoff_ms`. Errors whose `LlmError::retry_strategy`
//! says not to retry (bad key, bad request, unknown model) are final.

use crate::config::ExtractionConfig;
use crate::error::{ExtractionFailure, GenerationError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError, RetryStrategy};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A multimodal text generator.
///
/// The engine holds one `Arc<dyn GenerativeModel>` for its whole life and
/// calls it concurrently from independent requests, so implementations must
/// be safe to share.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Send `messages` and return the reply text.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, GenerationError>;
}

/// [`GenerativeModel`] backed by an `edgequake-llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl GenerativeModel for ProviderModel {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, GenerationError> {
        let response = self
            .provider
            .chat(messages, Some(options))
            .await
            .map_err(|e| classify_provider_error(&e))?;
        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Sort a provider error into transient or permanent using its retry strategy.
///
/// A retry resends the same context, so a token-limit error is final here.
pub fn classify_provider_error(err: &LlmError) -> GenerationError {
    match err.retry_strategy() {
        RetryStrategy::NoRetry | RetryStrategy::ReduceContext => {
            GenerationError::Permanent(err.to_string())
        }
        _ => GenerationError::Transient(err.to_string()),
    }
}

/// Run one generation with the configured timeout and retry policy.
pub async fn generate_with_retry(
    model: &dyn GenerativeModel,
    messages: &[ChatMessage],
    config: &ExtractionConfig,
) -> Result<String, ExtractionFailure> {
    let start = Instant::now();
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let max_retries = config.max_retries.min(1);

    let mut last_failure: Option<ExtractionFailure> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            warn!(
                "retry {}/{} after {}ms",
                attempt, max_retries, config.retry_backoff_ms
            );
            sleep(Duration::from_millis(config.retry_backoff_ms)).await;
        }

        match timeout(call_timeout, model.generate(messages, &options)).await {
            Ok(Ok(text)) => {
                debug!("generation finished in {:?}", start.elapsed());
                return Ok(text);
            }
            Ok(Err(e)) => {
                warn!("attempt {} failed — {}", attempt + 1, e);
                let transient = e.is_transient();
                last_failure = Some(ExtractionFailure::Remote {
                    attempts: attempt + 1,
                    detail: e.to_string(),
                });
                if !transient {
                    break;
                }
            }
            Err(_) => {
                warn!(
                    "attempt {} timed out after {}s",
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_failure = Some(ExtractionFailure::Timeout {
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    Err(last_failure.unwrap_or(ExtractionFailure::Remote {
        attempts: 0,
        detail: "no attempt was made".to_string(),
    }))
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
