//! Core domain types
//!
//! This module contains the core domain structures used across Corral services.
//! These types are shared between the manager (for persistence and supervision),
//! the agent (for reporting) and the client (for display).

pub mod runner;
