//! Run report

use serde::{Deserialize, Serialize};

use crate::domain::log::LogEntry;
use crate::domain::run::{PipelineRun, RunResult};

/// Final record of a run: the run itself, its result and collected logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run: PipelineRun,
    pub result: RunResult,
    pub logs: Vec<LogEntry>,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
