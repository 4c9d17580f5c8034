use std::sync::Arc;

use crate::error::Result;
use crate::shared::config::ToolsConfig;
use crate::tools::{CapabilityRegistry, GitHubTool, WeatherTool};

/// Registry holding every built-in capability.
pub fn instantiate_registry(config: &ToolsConfig) -> Result<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(GitHubTool::new(config)?))?;
    registry.register(Arc::new(WeatherTool::new(config)?))?;
    Ok(registry)
}
