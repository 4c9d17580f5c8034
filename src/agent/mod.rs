pub mod assistant;
pub mod execution;
pub mod planning;
pub mod verification;

pub use assistant::Assistant;
pub use execution::Executor;
pub use planning::Planner;
pub use verification::Verifier;
