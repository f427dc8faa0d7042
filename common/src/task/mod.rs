// Task module: payload runner and batch orchestration

pub mod orchestrator;
pub mod runner;

pub use orchestrator::{SqlToCsvTask, StatusTracker};
pub use runner::ExecutionRunner;
