//! Hoist Lua Infrastructure
//!
//! Workflows are written as Lua tables. This crate provides:
//! - A restricted sandbox with the `workflow` helper module
//! - Parsing of a workflow file into `WorkflowDefinition`
//!
//! Nothing in a workflow file is executed beyond building the table;
//! steps are data interpreted by the runner.

pub mod parser;
pub mod sandbox;

pub use parser::parse_workflow;
pub use sandbox::create_sandbox;
