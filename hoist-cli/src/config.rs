//! Configuration module
//!
//! Settings shared by every subcommand. Runner settings (engine,
//! workspace location) come from `hoist_runner::Config`.

use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the Lua workflow definition
    pub workflow_path: PathBuf,

    /// Repository location handed to the checkout step
    pub source: String,
}
