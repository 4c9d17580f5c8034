pub mod plan;
pub mod report;
pub mod verification;

pub use plan::{Plan, PlanStatus, Step};
pub use report::{ExecutionReport, ExecutionResult, ExecutionStatus};
pub use verification::{Findings, VerificationReport, VerificationStatus};
