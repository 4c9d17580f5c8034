pub mod backend;
pub mod client;

pub use backend::{HttpReasoningBackend, ReasoningBackend, ReasoningRequest};
pub use client::{ReasoningClient, RetryPolicy};
