use std::{env, fs, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils::json_extract::ExtractionMode;

/// Top-level assistant configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub reasoning: ReasoningConfig,
    pub planner: PlannerConfig,
    pub verifier: VerifierConfig,
    pub executor: ExecutorConfig,
    pub tools: ToolsConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub attempt_timeout_secs: u64,
    pub extraction: ExtractionMode,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
                .to_string(),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            attempt_timeout_secs: 60,
            extraction: ExtractionMode::Lenient,
        }
    }
}

impl ReasoningConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub temperature: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { temperature: 0.3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub temperature: f32,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self { temperature: 0.2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub max_retries: u32,
    /// Length of one backoff time unit; the wait before attempt `n` is `unit × 2^n`.
    pub backoff_unit_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_unit_ms: 1_000,
            max_backoff_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub openweather_api_key: Option<String>,
    pub openweather_api_url: String,
    pub http_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            github_api_url: "https://api.github.com".to_string(),
            openweather_api_key: None,
            openweather_api_url: "https://api.openweathermap.org/data/2.5".to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl AssistantConfig {
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            ..Default::default()
        }
    }

    /// Defaults, overlaid by an optional JSON file, overlaid by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.log_level.is_empty() {
            config.log_level = "info".to_string();
        }
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("REASONING_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")) {
            self.reasoning.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("REASONING_ENDPOINT") {
            self.reasoning.endpoint = endpoint;
        }
        if let Some(model) = lookup("REASONING_MODEL") {
            self.reasoning.model = model;
        }
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.tools.github_token = Some(token);
        }
        if let Some(key) = lookup("OPENWEATHER_API_KEY") {
            self.tools.openweather_api_key = Some(key);
        }
        if let Some(raw) = lookup("OPSAGENT_MAX_RETRIES") {
            self.executor.max_retries = parse_env("OPSAGENT_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("OPSAGENT_REASONING_TIMEOUT_SECS") {
            self.reasoning.attempt_timeout_secs =
                parse_env("OPSAGENT_REASONING_TIMEOUT_SECS", &raw)?;
        }
        if let Some(level) = lookup("OPSAGENT_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::new();
        assert_eq!(config.executor.max_retries, 2);
        assert_eq!(config.reasoning.max_attempts, 3);
        assert!(config.verifier.temperature < config.planner.temperature);
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AssistantConfig::new();
        config
            .apply_env(lookup(&[
                ("GOOGLE_API_KEY", "g-key"),
                ("GITHUB_TOKEN", "gh"),
                ("OPSAGENT_MAX_RETRIES", "5"),
                ("OPSAGENT_LOG_LEVEL", "debug"),
            ]))
            .unwrap();

        assert_eq!(config.reasoning.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.tools.github_token.as_deref(), Some("gh"));
        assert_eq!(config.executor.max_retries, 5);
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_reasoning_key_wins_over_google_key() {
        let mut config = AssistantConfig::new();
        config
            .apply_env(lookup(&[("GOOGLE_API_KEY", "g"), ("REASONING_API_KEY", "r")]))
            .unwrap();
        assert_eq!(config.reasoning.api_key.as_deref(), Some("r"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = AssistantConfig::new();
        let err = config
            .apply_env(lookup(&[("OPSAGENT_MAX_RETRIES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "OPSAGENT_MAX_RETRIES"));
    }

    #[test]
    fn test_partial_json_config_keeps_defaults() {
        let config: AssistantConfig =
            serde_json::from_str(r#"{"executor": {"max_retries": 4}, "reasoning": {"extraction": "strict"}}"#)
                .unwrap();
        assert_eq!(config.executor.max_retries, 4);
        assert_eq!(config.executor.backoff_unit_ms, 1_000);
        assert_eq!(config.reasoning.extraction, ExtractionMode::Strict);
        assert_eq!(config.reasoning.model, "gemini-2.5-flash");
    }
}
