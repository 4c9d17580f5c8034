use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::RegistryError;
use crate::tools::model::{Capability, ToolInfo};

/// Capabilities by name, kept in registration order.
///
/// Written during startup only; shared read-only (behind an `Arc`) while tasks run.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: Vec<Arc<dyn Capability>>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let name = capability.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateCapability(name));
        }

        self.index.insert(name.clone(), self.capabilities.len());
        self.capabilities.push(capability);
        info!("Capability {} registered", name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Capability>, RegistryError> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.capabilities[i]))
            .ok_or_else(|| RegistryError::UnknownCapability(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn list(&self) -> &[Arc<dyn Capability>] {
        &self.capabilities
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn describe(&self) -> Vec<ToolInfo> {
        self.capabilities.iter().map(|c| ToolInfo::of(c.as_ref())).collect()
    }
}
