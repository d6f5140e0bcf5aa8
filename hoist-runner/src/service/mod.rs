//! Service layer
//!
//! Services hold the runner's business logic: sequential run execution
//! and collection of run logs. Both are trait-based so callers and tests
//! can swap implementations.

mod execution;
mod log_buffer;

pub use execution::{ExecutionService, StandardExecutionService};
pub use log_buffer::{InMemoryLogBuffer, LogBufferService};
