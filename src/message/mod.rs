pub mod planner;
pub mod verifier;

pub use planner::planner_system_instruction;
pub use verifier::verifier_system_instruction;
