use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::Value;

use crate::models::{ExecutionReport, ExecutionResult, Plan};
use crate::tools::ToolInfo;

const MAX_RESULTS_CHARS: usize = 2_000;

pub fn build_tools_prompt(tools: &[ToolInfo]) -> String {
    let tools_text = tools
        .iter()
        .map(|tool| {
            let params = tool
                .parameters
                .iter()
                .map(|(name, description)| format!("{name}: {description}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                " - name: {}\n   description: {}\n   parameters: {}",
                tool.name, tool.description, params
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Available tools:\n{}\n\nIMPORTANT: These are the ONLY tools available. Do not use or reference any other tools.",
        tools_text
    )
}

pub fn build_plan_prompt(task: &str) -> String {
    format!(
        r#"Analyze this user request and create an execution plan:

User Request: {task}

Create a detailed step-by-step plan to accomplish this task. Consider:
- What information needs to be gathered?
- Which tools are needed?
- What order makes sense?
- What parameters are required?

Remember to output ONLY valid JSON matching the schema provided."#
    )
}

pub fn build_verification_prompt(plan: &Plan, report: &ExecutionReport) -> String {
    let successful = report.success_count();
    let failed = report.executed_steps - successful;

    let mut steps_summary = String::new();
    for result in &report.results {
        let mark = if result.success { "✓" } else { "✗" };
        let _ = writeln!(
            steps_summary,
            "{} Step {}: {} [{}] - {}",
            mark,
            result.step_number,
            result.action,
            result.tool,
            result_preview(result)
        );
    }

    let full_results: BTreeMap<String, &Value> = report
        .successful()
        .filter_map(|r| r.result.as_ref().map(|v| (format!("step_{}", r.step_number), v)))
        .collect();
    let full_results = serde_json::to_string_pretty(&full_results).unwrap_or_default();

    format!(
        r#"Verify the execution results for this task:

Original Task: {task}

Planned Steps: {planned}
Executed Steps: {executed}
Successful Steps: {successful}
Failed Steps: {failed}

Step Results Summary:
{steps_summary}
Full Results Data:
{results}

Analyze these results and provide a comprehensive verification report.
Focus on:
- Was the original task completed?
- Is the data complete and accurate?
- What are the key findings?
- What, if anything, is missing?"#,
        task = plan.task,
        planned = plan.steps.len(),
        executed = report.executed_steps,
        results = truncate(&full_results, MAX_RESULTS_CHARS),
    )
}

/// One-line description of a step outcome for the verification prompt.
pub fn result_preview(result: &ExecutionResult) -> String {
    if let Some(error) = &result.error {
        return format!("Error: {error}");
    }
    let Some(data) = result.result.as_ref().filter(|v| !v.is_null()) else {
        return "No data".to_string();
    };

    if let Some(repos) = data.get("repositories").and_then(Value::as_array) {
        format!("Found {} repositories", repos.len())
    } else if let Some(weather) = data.get("weather") {
        format!(
            "Temperature: {}{}, {}",
            display(weather.get("temperature")),
            weather.get("unit").and_then(Value::as_str).unwrap_or(""),
            display(weather.get("condition"))
        )
    } else if let Some(user) = data.get("user") {
        format!("User: {}", display(user.get("username")))
    } else if let Some(repo) = data.get("repository") {
        format!("Repository: {}", display(repo.get("full_name")))
    } else {
        "Data available".to_string()
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n... (truncated)", &text[..cut]),
        None => text.to_string(),
    }
}
