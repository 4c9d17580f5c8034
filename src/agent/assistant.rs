use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::agent::{Executor, Planner, Verifier};
use crate::error::Result;
use crate::models::VerificationReport;
use crate::prompt::builder::build_tools_prompt;
use crate::reasoning::{HttpReasoningBackend, ReasoningClient};
use crate::shared::config::AssistantConfig;
use crate::tools::{CapabilityRegistry, instantiate_registry};

/// Runs the plan, execute, verify pipeline for one task at a time.
pub struct Assistant {
    registry: Arc<CapabilityRegistry>,
    planner: Planner,
    executor: Executor,
    verifier: Verifier,
    max_retries: u32,
}

impl Assistant {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        planner: Planner,
        executor: Executor,
        verifier: Verifier,
    ) -> Self {
        Self {
            registry,
            planner,
            executor,
            verifier,
            max_retries: 2,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Wires the HTTP reasoning backend and the built-in capabilities from configuration.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let backend = Arc::new(HttpReasoningBackend::new(&config.reasoning)?);
        let client = Arc::new(ReasoningClient::from_config(backend, &config.reasoning));
        let registry = Arc::new(instantiate_registry(&config.tools)?);

        info!(
            model = %config.reasoning.model,
            tools = registry.len(),
            "Assistant initialized"
        );

        Ok(Self::new(
            registry,
            Planner::new(client.clone()).with_temperature(config.planner.temperature),
            Executor::from(&config.executor),
            Verifier::new(client).with_temperature(config.verifier.temperature),
        )
        .with_max_retries(config.executor.max_retries))
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Human-readable catalog of the registered capabilities.
    pub fn available_tools(&self) -> String {
        build_tools_prompt(&self.registry.describe())
    }

    /// Always returns a report; planning failures short-circuit before any capability runs.
    pub async fn process_task(&self, task: &str, max_retries: Option<u32>) -> VerificationReport {
        let task_id = Uuid::new_v4().simple().to_string();
        let span = info_span!("task", %task_id);
        self.run(task, max_retries.unwrap_or(self.max_retries))
            .instrument(span)
            .await
    }

    async fn run(&self, task: &str, max_retries: u32) -> VerificationReport {
        info!("Processing task: {}", task);

        let plan = match self.planner.create_plan(task, &self.registry).await {
            Ok(plan) => plan,
            Err(e) => {
                error!("Planning failed: {}", e);
                let recommendation = if e.is_retryable() {
                    "Retry the task once the reasoning service is reachable"
                } else {
                    "Retry the task; the planning response was not a usable plan"
                };
                return VerificationReport::failure(
                    format!("Planning failed: {e}"),
                    e.to_string(),
                    recommendation,
                );
            }
        };

        if plan.is_failed() {
            let reason = plan.warnings.join("; ");
            warn!("Plan has no executable steps: {}", reason);
            let tools: Vec<&str> = self.registry.list().iter().map(|c| c.name()).collect();
            return VerificationReport::failure(
                format!("Planning failed: no executable steps for: {task}"),
                reason,
                format!(
                    "Rephrase the task so it can be done with the available tools: {}",
                    tools.join(", ")
                ),
            );
        }

        let report = self.executor.execute_plan(&plan, &self.registry, max_retries).await;
        info!("{}", report.summary_line().replace('\n', ", "));

        let verified = self.verifier.verify_and_format(&plan, &report).await;
        info!(
            status = ?verified.status,
            score = verified.completeness_score,
            "Task finished"
        );
        verified
    }
}
