pub mod github;
pub mod instantiate;
pub mod model;
pub mod registry;
pub mod weather;

pub use github::GitHubTool;
pub use instantiate::instantiate_registry;
pub use model::{Capability, CapabilityOutput, ParameterSchema, Parameters, ToolInfo};
pub use registry::CapabilityRegistry;
pub use weather::WeatherTool;
