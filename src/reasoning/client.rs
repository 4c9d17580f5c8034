use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::ReasoningError;
use crate::reasoning::backend::{ReasoningBackend, ReasoningRequest};
use crate::shared::config::ReasoningConfig;
use crate::utils::json_extract::{ExtractionMode, extract_json};

const JSON_PROMPT_SUFFIX: &str =
    "IMPORTANT: Respond ONLY with valid JSON. No markdown, no explanations, just the JSON object.";
const JSON_SYSTEM_SUFFIX: &str = "You must respond with valid JSON only.";

/// Bounded retries with capped exponential backoff, plus a per-attempt deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ReasoningConfig::default())
    }
}

impl From<&ReasoningConfig> for RetryPolicy {
    fn from(config: &ReasoningConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            attempt_timeout: config.attempt_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt `attempt` (0-based): `base × 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Retrying front for a [`ReasoningBackend`].
///
/// Holds no per-call state, so one instance is shared by the planner and the verifier.
pub struct ReasoningClient {
    backend: Arc<dyn ReasoningBackend>,
    policy: RetryPolicy,
    extraction: ExtractionMode,
}

impl ReasoningClient {
    pub fn new(backend: Arc<dyn ReasoningBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            extraction: ExtractionMode::default(),
        }
    }

    pub fn from_config(backend: Arc<dyn ReasoningBackend>, config: &ReasoningConfig) -> Self {
        Self::new(backend, RetryPolicy::from(config)).with_extraction(config.extraction)
    }

    pub fn with_extraction(mut self, extraction: ExtractionMode) -> Self {
        self.extraction = extraction;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn complete(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String, ReasoningError> {
        let request = ReasoningRequest {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.to_string(),
            temperature,
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = ReasoningError::Unavailable {
            attempts: 0,
            message: "no attempt was made".to_string(),
        };

        for attempt in 0..max_attempts {
            match timeout(self.policy.attempt_timeout, self.backend.complete(&request)).await {
                Ok(Ok(text)) => {
                    debug!(attempt = attempt + 1, chars = text.len(), "completion received");
                    return Ok(text);
                }
                Ok(Err(e)) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "reasoning backend call failed"
                    );
                    last_error = ReasoningError::Unavailable {
                        attempts: attempt + 1,
                        message: e.to_string(),
                    };
                }
                Err(_) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        deadline_ms = self.policy.attempt_timeout.as_millis() as u64,
                        "reasoning backend call timed out"
                    );
                    last_error = ReasoningError::Timeout(self.policy.attempt_timeout);
                }
            }

            if attempt + 1 < max_attempts {
                sleep(self.policy.delay_for(attempt)).await;
            }
        }

        Err(last_error)
    }

    /// Like [`complete`](Self::complete), then extracts a JSON value from the text.
    ///
    /// Malformed content fails immediately with [`ReasoningError::MalformedResponse`].
    pub async fn complete_structured(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<Value, ReasoningError> {
        let prompt = format!("{prompt}\n\n{JSON_PROMPT_SUFFIX}");
        let system_instruction = if system_instruction.is_empty() {
            JSON_SYSTEM_SUFFIX.to_string()
        } else {
            format!("{system_instruction}\n{JSON_SYSTEM_SUFFIX}")
        };

        let text = self.complete(&prompt, &system_instruction, temperature).await?;
        extract_json(&text, self.extraction).map_err(|reason| {
            warn!(%reason, "could not extract JSON from completion");
            ReasoningError::MalformedResponse(reason)
        })
    }
}
