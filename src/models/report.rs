use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::plan::Step;

/// Outcome of one plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub step_number: u32,

    pub action: String,

    pub tool: String,

    pub success: bool,

    pub result: Option<Value>,

    pub error: Option<String>,

    /// Invocations made; 0 when the capability could not be resolved.
    pub attempts: u32,
}

impl ExecutionResult {
    pub fn succeeded(step: &Step, result: Value, attempts: u32) -> Self {
        Self {
            step_number: step.step_number,
            action: step.action.clone(),
            tool: step.tool.clone(),
            success: true,
            result: Some(result),
            error: None,
            attempts,
        }
    }

    pub fn failed(step: &Step, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            step_number: step.step_number,
            action: step.action.clone(),
            tool: step.tool.clone(),
            success: false,
            result: None,
            error: Some(error.into()),
            attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Partial,
    Failed,
}

impl ExecutionStatus {
    /// An empty result list counts as success: nothing that was asked for failed.
    pub fn from_results(results: &[ExecutionResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        if succeeded == results.len() {
            ExecutionStatus::Success
        } else if succeeded == 0 {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Partial
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: ExecutionStatus,

    pub total_steps: usize,

    pub executed_steps: usize,

    pub results: Vec<ExecutionResult>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn new(
        total_steps: usize,
        results: Vec<ExecutionResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: ExecutionStatus::from_results(&results),
            total_steps,
            executed_steps: results.len(),
            results,
            started_at,
            finished_at,
        }
    }

    pub fn successful(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn success_count(&self) -> usize {
        self.successful().count()
    }

    pub fn summary_line(&self) -> String {
        let successful = self.success_count();
        format!(
            "Executed {}/{} steps\nSuccessful: {}, Failed: {}",
            self.executed_steps,
            self.total_steps,
            successful,
            self.executed_steps - successful
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Parameters;
    use serde_json::json;

    fn step(n: u32) -> Step {
        Step {
            step_number: n,
            ..Step::new("do something", "github", Parameters::new())
        }
    }

    fn report(results: Vec<ExecutionResult>) -> ExecutionReport {
        let now = Utc::now();
        ExecutionReport::new(results.len(), results, now, now)
    }

    #[test]
    fn test_status_reflects_outcomes() {
        let ok = ExecutionResult::succeeded(&step(1), json!({"ok": true}), 1);
        let bad = ExecutionResult::failed(&step(2), "boom", 3);

        assert_eq!(report(vec![ok.clone(), ok.clone()]).status, ExecutionStatus::Success);
        assert_eq!(report(vec![ok, bad.clone()]).status, ExecutionStatus::Partial);
        assert_eq!(report(vec![bad.clone(), bad]).status, ExecutionStatus::Failed);
    }

    #[test]
    fn test_result_and_error_are_exclusive() {
        let ok = ExecutionResult::succeeded(&step(1), json!({}), 1);
        assert!(ok.result.is_some() && ok.error.is_none());

        let bad = ExecutionResult::failed(&step(1), "nope", 2);
        assert!(bad.result.is_none() && bad.error.is_some());
    }

    #[test]
    fn test_summary_line_counts() {
        let r = report(vec![
            ExecutionResult::succeeded(&step(1), json!({}), 1),
            ExecutionResult::failed(&step(2), "x", 1),
        ]);
        assert_eq!(r.summary_line(), "Executed 2/2 steps\nSuccessful: 1, Failed: 1");
    }
}
