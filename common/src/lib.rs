// Library for the SQL-to-CSV task: backend connectors, CSV writer,
// payload runner and batch orchestration

pub mod config;
pub mod errors;
pub mod executor;
pub mod models;
pub mod task;
pub mod telemetry;
