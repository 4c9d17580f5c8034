use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ReasoningError;
use crate::message::planner_system_instruction;
use crate::models::{Plan, Step};
use crate::prompt::builder::{build_plan_prompt, build_tools_prompt};
use crate::reasoning::ReasoningClient;
use crate::tools::{CapabilityRegistry, Parameters};

pub const DEFAULT_PLANNING_TEMPERATURE: f32 = 0.3;

/// Turns a natural-language task into a validated [`Plan`].
pub struct Planner {
    client: Arc<ReasoningClient>,
    temperature: f32,
}

impl Planner {
    pub fn new(client: Arc<ReasoningClient>) -> Self {
        Self {
            client,
            temperature: DEFAULT_PLANNING_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Reasoning failures propagate; steps naming unknown capabilities are dropped with a warning.
    pub async fn create_plan(
        &self,
        task: &str,
        registry: &CapabilityRegistry,
    ) -> Result<Plan, ReasoningError> {
        info!("Planning task: {}", task);

        let catalog = build_tools_prompt(&registry.describe());
        let system_instruction = planner_system_instruction(&catalog);
        let prompt = build_plan_prompt(task);

        let raw = self
            .client
            .complete_structured(&prompt, &system_instruction, self.temperature)
            .await?;

        let plan = validate_plan(task, &raw, registry)?;
        for warning in &plan.warnings {
            warn!("Plan validation: {}", warning);
        }
        info!(
            steps = plan.steps.len(),
            dropped = plan.warnings.len(),
            status = ?plan.status,
            "Plan created"
        );
        Ok(plan)
    }
}

/// Checks a reasoning response against the plan schema and the registry.
///
/// Output that is not an object with a `steps` array is malformed. Individual invalid steps are
/// dropped and survivors renumbered from 1.
pub fn validate_plan(
    task: &str,
    raw: &Value,
    registry: &CapabilityRegistry,
) -> Result<Plan, ReasoningError> {
    let steps = raw
        .as_object()
        .ok_or_else(|| ReasoningError::MalformedResponse("plan is not a JSON object".to_string()))?
        .get("steps")
        .and_then(Value::as_array)
        .ok_or_else(|| ReasoningError::MalformedResponse("plan has no 'steps' array".to_string()))?;

    let mut warnings = Vec::new();
    let mut valid = Vec::with_capacity(steps.len());

    for (index, entry) in steps.iter().enumerate() {
        let position = index + 1;
        match parse_step(entry) {
            Ok(step) if registry.contains(&step.tool) => valid.push(step),
            Ok(step) => warnings.push(format!(
                "step {position} references unknown tool '{}' and was dropped",
                step.tool
            )),
            Err(reason) => warnings.push(format!("step {position} was dropped: {reason}")),
        }
    }

    debug!(valid = valid.len(), dropped = warnings.len(), "plan steps validated");

    if valid.is_empty() {
        if warnings.is_empty() {
            warnings.push("plan contains no steps".to_string());
        }
        return Ok(Plan::failed(task, warnings));
    }

    Ok(Plan::new(task, valid).with_warnings(warnings))
}

fn parse_step(entry: &Value) -> Result<Step, String> {
    let object = entry.as_object().ok_or("step is not a JSON object")?;

    let tool = object
        .get("tool")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("step has no 'tool'")?;

    let action = object
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let parameters = match object.get("parameters") {
        None | Some(Value::Null) => Parameters::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err("'parameters' is not a JSON object".to_string()),
    };

    Ok(Step::new(action, tool, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, CapabilityError};
    use crate::models::PlanStatus;
    use crate::reasoning::{ReasoningBackend, ReasoningRequest, RetryPolicy};
    use crate::tools::{Capability, CapabilityOutput, ParameterSchema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Named(&'static str);

    #[async_trait]
    impl Capability for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn parameter_schema(&self) -> ParameterSchema {
            ParameterSchema::new().param("q", "query")
        }
        async fn invoke(&self, _: &Parameters) -> Result<CapabilityOutput, CapabilityError> {
            Ok(CapabilityOutput::ok(json!({})))
        }
    }

    struct Fixed {
        reply: Option<String>,
        seen: Mutex<Vec<ReasoningRequest>>,
    }

    #[async_trait]
    impl ReasoningBackend for Fixed {
        async fn complete(&self, request: &ReasoningRequest) -> Result<String, BackendError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().ok_or(BackendError::EmptyResponse)
        }
    }

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Named("github"))).unwrap();
        registry.register(Arc::new(Named("weather"))).unwrap();
        registry
    }

    fn planner(reply: Option<&str>) -> (Planner, Arc<Fixed>) {
        let backend = Arc::new(Fixed {
            reply: reply.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        });
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
        };
        let client = Arc::new(ReasoningClient::new(backend.clone(), policy));
        (Planner::new(client), backend)
    }

    #[test]
    fn test_validate_drops_unknown_tools_and_renumbers() {
        let raw = json!({
            "task": "x",
            "steps": [
                {"step_number": 1, "action": "translate", "tool": "translate", "parameters": {}},
                {"step_number": 2, "action": "search", "tool": "github", "parameters": {"q": "rust"}},
                {"step_number": 7, "action": "forecast", "tool": "weather"}
            ]
        });

        let plan = validate_plan("x", &raw, &registry()).unwrap();
        assert_eq!(plan.status, PlanStatus::Success);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].step_number, 1);
        assert_eq!(plan.steps[0].tool, "github");
        assert_eq!(plan.steps[0].parameters["q"], "rust");
        assert_eq!(plan.steps[1].step_number, 2);
        assert!(plan.steps[1].parameters.is_empty());
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("translate"));
    }

    #[test]
    fn test_validate_all_invalid_gives_failed_plan() {
        let raw = json!({"steps": [{"tool": "translate"}, "not a step", {"tool": "github", "parameters": [1]}]});
        let plan = validate_plan("x", &raw, &registry()).unwrap();
        assert_eq!(plan.status, PlanStatus::Failed);
        assert!(plan.steps.is_empty());
        assert_eq!(plan.warnings.len(), 3);
    }

    #[test]
    fn test_validate_rejects_schema_violations() {
        assert!(matches!(
            validate_plan("x", &json!([1, 2]), &registry()),
            Err(ReasoningError::MalformedResponse(_))
        ));
        assert!(matches!(
            validate_plan("x", &json!({"task": "x"}), &registry()),
            Err(ReasoningError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_create_plan_uses_catalog_and_low_temperature() {
        let (planner, backend) = planner(Some(
            "```json\n{\"task\": \"t\", \"steps\": [{\"step_number\": 1, \"action\": \"a\", \"tool\": \"weather\", \"parameters\": {\"city\": \"Paris\"}}]}\n```",
        ));

        let plan = planner.create_plan("weather in Paris", &registry()).await.unwrap();
        assert_eq!(plan.task, "weather in Paris");
        assert_eq!(plan.steps.len(), 1);

        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].system_instruction.contains("- name: github"));
        assert!(seen[0].prompt.contains("weather in Paris"));
        assert_eq!(seen[0].temperature, DEFAULT_PLANNING_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_create_plan_propagates_reasoning_errors() {
        let (unavailable, _) = planner(None);
        let err = unavailable.create_plan("anything", &registry()).await.unwrap_err();
        assert!(matches!(err, ReasoningError::Unavailable { attempts: 2, .. }));

        let (chatty, _) = planner(Some("I'd rather not."));
        let err = chatty.create_plan("anything", &registry()).await.unwrap_err();
        assert!(matches!(err, ReasoningError::MalformedResponse(_)));
    }
}
