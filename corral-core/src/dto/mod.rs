//! Data Transfer Objects for inter-service communication
//!
//! This module contains DTOs used for communication between Corral services:
//! the manager HTTP API consumed by the browser panel and the CLI, and the
//! control protocol the manager speaks with each runner agent.

pub mod agent;
pub mod runner;
pub mod system;
