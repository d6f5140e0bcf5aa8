//! Core domain types
//!
//! The workflow describes what should happen; a run records what did happen.
//! Both are plain data shared between the Lua parser and the runner.

pub mod log;
pub mod run;
pub mod step;
pub mod trigger;
pub mod workflow;
