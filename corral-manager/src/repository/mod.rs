//! Repository Module
//!
//! Data access layer for the manager.
//! - `runner`: the runner store contract and its in-memory implementation
//! - `postgres`: the Postgres-backed runner store
//! - `control`: HTTP control calls against runner agents
//! - `log`: sources of runner log output

pub mod control;
pub mod log;
pub mod postgres;
pub mod runner;

// Re-export for convenience
pub use control::{ControlError, HttpRunnerControl, RunnerControl};
pub use log::{FileLogSource, HttpLogSource, LogSource};
pub use postgres::PgRunnerStore;
pub use runner::{DeleteOutcome, InMemoryRunnerStore, RunnerStore, StoreError};
