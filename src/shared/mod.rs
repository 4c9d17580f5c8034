pub mod config;

pub use config::AssistantConfig;
