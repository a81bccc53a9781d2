//! Corral Core
//!
//! Core types and abstractions for the Corral runner fleet manager.
//!
//! This crate contains:
//! - Domain types: Core business entities (RunnerRecord, RunnerStatus)
//! - DTOs: Data transfer objects for the manager API and the runner agent protocol

pub mod domain;
pub mod dto;
