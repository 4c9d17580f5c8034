use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::CapabilityError;
use crate::models::{ExecutionReport, ExecutionResult, Plan, Step};
use crate::shared::config::ExecutorConfig;
use crate::tools::{Capability, CapabilityOutput, CapabilityRegistry, Parameters};

/// Runs plan steps one after another, retrying each capability with exponential backoff.
#[derive(Debug, Clone)]
pub struct Executor {
    backoff_unit: Duration,
    max_backoff: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self::from(&ExecutorConfig::default())
    }
}

impl From<&ExecutorConfig> for Executor {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl Executor {
    pub fn new(backoff_unit: Duration, max_backoff: Duration) -> Self {
        Self {
            backoff_unit,
            max_backoff,
        }
    }

    /// Wait before attempt `attempt` (0-based, `attempt >= 1`): `unit × 2^attempt`, capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.backoff_unit.saturating_mul(factor).min(self.max_backoff)
    }

    /// Executes every step in order. A failing step never stops the steps after it.
    pub async fn execute_plan(
        &self,
        plan: &Plan,
        registry: &CapabilityRegistry,
        max_retries: u32,
    ) -> ExecutionReport {
        let started_at = Utc::now();
        let mut results = Vec::with_capacity(plan.steps.len());

        for step in &plan.steps {
            info!("Executing Step {}: {} [{}]", step.step_number, step.action, step.tool);
            debug!(step = step.step_number, parameters = ?step.parameters, "step parameters");

            let result = match registry.get(&step.tool) {
                Ok(capability) => self.execute_step(step, capability, max_retries).await,
                Err(e) => {
                    warn!("Step {} skipped: {}", step.step_number, e);
                    ExecutionResult::failed(step, e.to_string(), 0)
                }
            };
            results.push(result);
        }

        let report = ExecutionReport::new(plan.steps.len(), results, started_at, Utc::now());
        info!(
            status = ?report.status,
            executed = report.executed_steps,
            succeeded = report.success_count(),
            "Plan execution finished"
        );
        report
    }

    async fn execute_step(
        &self,
        step: &Step,
        capability: Arc<dyn Capability>,
        max_retries: u32,
    ) -> ExecutionResult {
        let total_attempts = max_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 0..total_attempts {
            if attempt > 0 {
                let delay = self.backoff_for(attempt);
                debug!(
                    step = step.step_number,
                    retry = attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying step"
                );
                sleep(delay).await;
            }

            match invoke_guarded(capability.as_ref(), &step.parameters).await {
                Ok(output) if output.success => {
                    info!("Step {} completed successfully", step.step_number);
                    return ExecutionResult::succeeded(step, output.data, attempt + 1);
                }
                Ok(output) => {
                    last_error = output.error.unwrap_or_else(|| {
                        "capability reported failure without an error".to_string()
                    });
                    warn!("Step {} failed: {}", step.step_number, last_error);
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!("Step {} error: {}", step.step_number, last_error);
                }
            }
        }

        ExecutionResult::failed(
            step,
            format!("Failed after {total_attempts} attempt(s): {last_error}"),
            total_attempts,
        )
    }
}

/// Invokes a capability, turning a panic into an ordinary attempt failure.
async fn invoke_guarded(
    capability: &dyn Capability,
    parameters: &Parameters,
) -> Result<CapabilityOutput, CapabilityError> {
    match AssertUnwindSafe(capability.invoke(parameters)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(CapabilityError::Panicked(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExecutionStatus;
    use crate::tools::ParameterSchema;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        name: &'static str,
        failures: u32,
        raise: bool,
        calls: Mutex<Vec<tokio::time::Instant>>,
    }

    impl Flaky {
        fn new(name: &'static str, failures: u32) -> Arc<Self> {
            Arc::new(Self {
                name,
                failures,
                raise: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn raising(name: &'static str, failures: u32) -> Arc<Self> {
            Arc::new(Self {
                name,
                failures,
                raise: true,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<tokio::time::Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Capability for Flaky {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "flaky test capability"
        }

        fn parameter_schema(&self) -> ParameterSchema {
            ParameterSchema::new()
        }

        async fn invoke(

            &self,

            parameters: &Parameters,

        ) -> Result<CapabilityOutput, CapabilityError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(tokio::time::Instant::now());
                calls.len() as u32
            };
            if call <= self.failures {
                if self.raise {
                    return Err(CapabilityError::Other(format!("{} exploded", self.name)));
                }
                return Ok(CapabilityOutput::failure(format!("{} unavailable", self.name)));
            }
            Ok(CapabilityOutput::ok(json!({"tool": self.name, "echo": parameters})))
        }
    }

    struct Panicky;

    #[async_trait]
    impl Capability for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }
        fn description(&self) -> &str {
            "always panics"
        }
        fn parameter_schema(&self) -> ParameterSchema {
            ParameterSchema::new()
        }
        async fn invoke(&self, _: &Parameters) -> Result<CapabilityOutput, CapabilityError> {
            panic!("index out of bounds")
        }
    }

    fn plan(tools: &[&str]) -> Plan {
        Plan::new(
            "test",
            tools
                .iter()
                .map(|t| Step::new(format!("use {t}"), *t, Parameters::new()))
                .collect(),
        )
    }

    fn executor() -> Executor {
        Executor::new(Duration::from_millis(10), Duration::from_secs(60))
    }

    #[test]
    fn test_backoff_doubles() {
        let executor = Executor::new(Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(executor.backoff_for(1), Duration::from_secs(2));
        assert_eq!(executor.backoff_for(2), Duration::from_secs(4));
        assert_eq!(executor.backoff_for(3), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_steps_succeed_first_try() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Flaky::new("github", 0)).unwrap();
        registry.register(Flaky::new("weather", 0)).unwrap();

        let report = executor()
            .execute_plan(&plan(&["github", "weather"]), &registry, 2)
            .await;

        assert_eq!(report.status, ExecutionStatus::Success);
        assert_eq!(report.total_steps, 2);
        assert_eq!(report.executed_steps, 2);
        assert!(report.results.iter().all(|r| r.success && r.attempts == 1));
        assert_eq!(report.results[1].result.as_ref().unwrap()["tool"], "weather");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tool_is_recorded_without_attempts() {
        let registry = CapabilityRegistry::new();
        let report = executor().execute_plan(&plan(&["translate"]), &registry, 2).await;

        assert_eq!(report.status, ExecutionStatus::Failed);
        let result = &report.results[0];
        assert!(!result.success);
        assert_eq!(result.attempts, 0);
        assert!(result.error.as_deref().unwrap().contains("translate"));
        assert!(result.result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_with_backoff() {
        let flaky = Flaky::new("github", 2);
        let mut registry = CapabilityRegistry::new();
        registry.register(flaky.clone()).unwrap();

        let report = executor().execute_plan(&plan(&["github"]), &registry, 2).await;

        let result = &report.results[0];
        assert!(result.success);
        assert_eq!(result.attempts, 3);

        let calls = flaky.call_times();
        assert_eq!(calls.len(), 3);
        assert!(calls[1] - calls[0] >= Duration::from_millis(20));
        assert!(calls[2] - calls[1] >= Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_keeps_last_error_and_continues() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Flaky::raising("github", u32::MAX)).unwrap();
        registry.register(Flaky::new("weather", 0)).unwrap();

        let report = executor()
            .execute_plan(&plan(&["github", "weather"]), &registry, 3)
            .await;

        assert_eq!(report.status, ExecutionStatus::Partial);
        let failed = &report.results[0];
        assert!(!failed.success);
        assert_eq!(failed.attempts, 4);
        assert!(failed.error.as_deref().unwrap().contains("github exploded"));
        assert!(report.results[1].success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_single_attempt() {
        let flaky = Flaky::new("github", 1);
        let mut registry = CapabilityRegistry::new();
        registry.register(flaky.clone()).unwrap();

        let report = executor().execute_plan(&plan(&["github"]), &registry, 0).await;
        assert_eq!(report.results[0].attempts, 1);
        assert!(!report.results[0].success);
        assert_eq!(flaky.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_capability_is_a_failed_attempt() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Panicky)).unwrap();

        let report = executor().execute_plan(&plan(&["panicky"]), &registry, 1).await;
        let result = &report.results[0];
        assert!(!result.success);
        assert_eq!(result.attempts, 2);
        assert!(result.error.as_deref().unwrap().contains("index out of bounds"));
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let report = executor()
            .execute_plan(&Plan::failed("nothing", Vec::new()), &CapabilityRegistry::new(), 2)
            .await;
        assert_eq!(report.total_steps, 0);
        assert_eq!(report.executed_steps, 0);
        assert!(report.results.is_empty());
    }
}
