//! Service Module
//!
//! Business logic layer for the manager.
//! Services orchestrate between repositories and contain domain logic.

pub mod log;
pub mod runner;
pub mod supervisor;

// Re-export for convenience
pub use log as log_service;
pub use runner as runner_service;
pub use supervisor::Supervisor;
