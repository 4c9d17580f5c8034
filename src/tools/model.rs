use async_trait::async_trait;
use serde::{Serialize, ser::SerializeMap};
use serde_json::{Map, Value};

use crate::error::CapabilityError;

/// Parameters bound to a step, as produced by the planner.
pub type Parameters = Map<String, Value>;

/// Ordered `name → description` pairs describing a capability's parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema(Vec<(String, String)>);

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.0.push((name.into(), description.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, d)| (n.as_str(), d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ParameterSchema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, description) in &self.0 {
            map.serialize_entry(name, description)?;
        }
        map.end()
    }
}

/// What a capability reports back for one invocation.
///
/// Expected failures (bad parameters, rate limits, missing configuration) are reported here with
/// `success: false` rather than raised as [`CapabilityError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityOutput {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

impl CapabilityOutput {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Outcome of one provider HTTP call that reached the provider.
pub(crate) enum ApiReply {
    Body(Value),
    /// Non-success status, carrying the message reported to the caller.
    Rejected(String),
}

/// A named external operation the planner can choose and the executor can invoke.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique, stable identifier used in plans.
    fn name(&self) -> &str;

    /// Used verbatim in planning prompts.
    fn description(&self) -> &str;

    fn parameter_schema(&self) -> ParameterSchema;

    async fn invoke(&self, parameters: &Parameters) -> Result<CapabilityOutput, CapabilityError>;
}

/// Discovery view of a capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolInfo {
    pub fn of(capability: &dyn Capability) -> Self {
        Self {
            name: capability.name().to_string(),
            description: capability.description().to_string(),
            parameters: capability.parameter_schema(),
        }
    }
}

pub fn param_str<'a>(parameters: &'a Parameters, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Reads a non-negative integer given either as a JSON number or a numeric string.
pub fn param_u64(parameters: &Parameters, key: &str) -> Option<u64> {
    match parameters.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameter_schema_serializes_as_ordered_map() {
        let schema = ParameterSchema::new()
            .param("city", "City name")
            .param("units", "metric or imperial");
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value, json!({"city": "City name", "units": "metric or imperial"}));
        let names: Vec<&str> = schema.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["city", "units"]);
    }

    #[test]
    fn test_param_helpers() {
        let params: Parameters = serde_json::from_value(json!({
            "query": "  rust ",
            "empty": "",
            "limit": "7",
            "count": 3,
        }))
        .unwrap();

        assert_eq!(param_str(&params, "query"), Some("rust"));
        assert_eq!(param_str(&params, "empty"), None);
        assert_eq!(param_u64(&params, "limit"), Some(7));
        assert_eq!(param_u64(&params, "count"), Some(3));
        assert_eq!(param_u64(&params, "missing"), None);
    }
}
