pub mod agent;
pub mod error;
pub mod message;
pub mod models;
pub mod prompt;
pub mod reasoning;
pub mod shared;
pub mod tools;
pub mod utils;

pub use agent::{Assistant, Executor, Planner, Verifier};
pub use error::{Error, Result};
pub use models::{ExecutionReport, Plan, VerificationReport};
pub use shared::AssistantConfig;
pub use tools::{Capability, CapabilityRegistry};
