use serde::{Deserialize, Serialize};

use crate::tools::Parameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Success,
    Failed,
}

/// An ordered, immutable list of capability invocations for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub task: String,

    pub status: PlanStatus,

    pub steps: Vec<Step>,

    /// Steps the planner dropped while validating the reasoning output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Plan {
    /// Builds a successful plan, numbering `steps` from 1 in order.
    pub fn new(task: impl Into<String>, steps: Vec<Step>) -> Self {
        let steps: Vec<Step> = steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| Step {
                step_number: index as u32 + 1,
                ..step
            })
            .collect();

        let status = if steps.is_empty() {
            PlanStatus::Failed
        } else {
            PlanStatus::Success
        };

        Self {
            task: task.into(),
            status,
            steps,
            warnings: Vec::new(),
        }
    }

    pub fn failed(task: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            task: task.into(),
            status: PlanStatus::Failed,
            steps: Vec::new(),
            warnings,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == PlanStatus::Failed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_number: u32,

    pub action: String,

    pub tool: String,

    #[serde(default)]
    pub parameters: Parameters,
}

impl Step {
    pub fn new(action: impl Into<String>, tool: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            step_number: 0,
            action: action.into(),
            tool: tool.into(),
            parameters,
        }
    }
}
