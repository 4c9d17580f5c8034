pub mod verifier;

pub use verifier::{Verifier, fallback_report};
