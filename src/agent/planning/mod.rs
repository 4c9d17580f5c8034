pub mod planner;

pub use planner::{Planner, validate_plan};
