//! Hoist Core
//!
//! Core types for the Hoist image pipeline runner.
//!
//! This crate contains:
//! - Domain types: workflow definition, triggers, pipeline runs, steps, logs
//! - DTOs: serializable summaries handed to callers once a run finishes

pub mod domain;
pub mod dto;
