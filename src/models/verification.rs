use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Complete,
    Partial,
    Incomplete,
}

impl VerificationStatus {
    /// Maps free-form status text onto the three known values; anything else is `Incomplete`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "complete" => VerificationStatus::Complete,
            "partial" => VerificationStatus::Partial,
            _ => VerificationStatus::Incomplete,
        }
    }

    pub fn from_score(score: u8) -> Self {
        match score {
            100 => VerificationStatus::Complete,
            0 => VerificationStatus::Incomplete,
            _ => VerificationStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Findings {
    pub key_results: Vec<String>,
    pub data_quality: String,
    pub missing_information: Vec<String>,
}

/// Final, user-facing report of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub status: VerificationStatus,

    pub completeness_score: u8,

    pub summary: String,

    pub findings: Findings,

    pub recommendations: Vec<String>,

    /// Successful step results keyed by step number.
    pub data: BTreeMap<u32, Value>,
}

impl VerificationReport {
    /// Report for a task that never reached execution.
    pub fn failure(
        summary: impl Into<String>,
        reason: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            status: VerificationStatus::Incomplete,
            completeness_score: 0,
            summary: summary.into(),
            findings: Findings {
                key_results: Vec::new(),
                data_quality: "No data was collected".to_string(),
                missing_information: vec![reason.into()],
            },
            recommendations: vec![recommendation.into()],
            data: BTreeMap::new(),
        }
    }
}

/// Clamps an arbitrary JSON score into 0..=100, accepting numbers and numeric strings.
pub fn clamp_score(raw: &Value) -> Option<u8> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if value.is_nan() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}
