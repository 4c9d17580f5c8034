use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ReasoningError;
use crate::message::verifier_system_instruction;
use crate::models::verification::clamp_score;
use crate::models::{ExecutionReport, Findings, Plan, VerificationReport, VerificationStatus};
use crate::prompt::builder::build_verification_prompt;
use crate::reasoning::ReasoningClient;

pub const DEFAULT_VERIFICATION_TEMPERATURE: f32 = 0.2;

/// Judges execution results against the task and produces the final report.
pub struct Verifier {
    client: Arc<ReasoningClient>,
    temperature: f32,
}

/// Lenient view of the reasoning response; anything missing is filled in locally.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VerificationDraft {
    status: Option<String>,
    completeness_score: Option<Value>,
    summary: Option<String>,
    findings: Option<FindingsDraft>,
    recommendations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FindingsDraft {
    key_results: Vec<String>,
    data_quality: Option<String>,
    missing_information: Vec<String>,
}

impl Verifier {
    pub fn new(client: Arc<ReasoningClient>) -> Self {
        Self {
            client,
            temperature: DEFAULT_VERIFICATION_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Never fails: any reasoning error switches to [`fallback_report`].
    pub async fn verify_and_format(
        &self,
        plan: &Plan,
        report: &ExecutionReport,
    ) -> VerificationReport {
        info!("Verifying execution results");
        match self.verify_with_reasoning(plan, report).await {
            Ok(verified) => {
                info!(
                    status = ?verified.status,
                    score = verified.completeness_score,
                    "Verification complete"
                );
                verified
            }
            Err(e) => {
                warn!("Verification fell back to deterministic summary: {}", e);
                fallback_report(plan, report)
            }
        }
    }

    async fn verify_with_reasoning(
        &self,
        plan: &Plan,
        report: &ExecutionReport,
    ) -> Result<VerificationReport, ReasoningError> {
        let prompt = build_verification_prompt(plan, report);
        let raw = self
            .client
            .complete_structured(&prompt, verifier_system_instruction(), self.temperature)
            .await?;

        if !raw.is_object() {
            return Err(ReasoningError::MalformedResponse(
                "verification is not a JSON object".to_string(),
            ));
        }
        let draft: VerificationDraft = serde_json::from_value(raw)
            .map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;
        if draft.status.is_none() && draft.completeness_score.is_none() {
            return Err(ReasoningError::MalformedResponse(
                "verification has neither 'status' nor 'completeness_score'".to_string(),
            ));
        }

        Ok(adopt_draft(draft, plan, report))
    }
}

fn adopt_draft(
    draft: VerificationDraft,
    plan: &Plan,
    report: &ExecutionReport,
) -> VerificationReport {
    let completeness_score = draft
        .completeness_score
        .as_ref()
        .and_then(clamp_score)
        .unwrap_or_else(|| success_ratio(report));

    let status = draft
        .status
        .as_deref()
        .map(VerificationStatus::coerce)
        .unwrap_or(VerificationStatus::Incomplete);

    let findings = draft.findings.unwrap_or_default();

    VerificationReport {
        status,
        completeness_score,
        summary: draft
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| templated_summary(plan, report)),
        findings: Findings {
            key_results: findings.key_results,
            data_quality: findings.data_quality.unwrap_or_default(),
            missing_information: findings.missing_information,
        },
        recommendations: draft.recommendations,
        data: collect_data(report),
    }
}

/// Deterministic, reasoning-free report computed only from success and failure counts.
pub fn fallback_report(plan: &Plan, report: &ExecutionReport) -> VerificationReport {
    let completeness_score = success_ratio(report);

    let key_results = report
        .successful()
        .filter_map(|r| r.result.as_ref())
        .map(|v| v.to_string())
        .collect();

    let missing_information = report
        .failed()
        .map(|r| {
            format!(
                "Step {} ({}): {}",
                r.step_number,
                r.tool,
                r.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    VerificationReport {
        status: VerificationStatus::from_score(completeness_score),
        completeness_score,
        summary: templated_summary(plan, report),
        findings: Findings {
            key_results,
            data_quality:
                "Unable to verify automatically; results are reported as returned by each tool"
                    .to_string(),
            missing_information,
        },
        recommendations: Vec::new(),
        data: collect_data(report),
    }
}

fn success_ratio(report: &ExecutionReport) -> u8 {
    if report.total_steps == 0 {
        return 0;
    }
    let ratio = 100.0 * report.success_count() as f64 / report.total_steps as f64;
    ratio.round().clamp(0.0, 100.0) as u8
}

fn templated_summary(plan: &Plan, report: &ExecutionReport) -> String {
    let succeeded = report.success_count();
    format!(
        "Completed {} out of {} steps for: {} ({} succeeded, {} failed)",
        succeeded,
        report.total_steps,
        plan.task,
        succeeded,
        report.executed_steps - succeeded
    )
}

fn collect_data(report: &ExecutionReport) -> BTreeMap<u32, Value> {
    report
        .successful()
        .filter_map(|r| r.result.clone().map(|v| (r.step_number, v)))
        .collect()
}
