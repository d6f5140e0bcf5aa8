//! Log buffer service
//!
//! Collects run-level log entries (step boundaries, command lines and
//! their masked output) so they can be printed or written to a report
//! once the run ends.

use hoist_core::domain::log::LogEntry;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe sink for run log entries
pub trait LogBufferService: Send + Sync {
    /// Appends an entry
    fn add_entry(&self, entry: LogEntry);

    /// Removes and returns every buffered entry
    fn drain(&self) -> Vec<LogEntry>;
}

/// In-memory implementation of LogBufferService
#[derive(Clone, Default)]
pub struct InMemoryLogBuffer {
    buffer: Arc<Mutex<Vec<LogEntry>>>,
}

impl InMemoryLogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogBufferService for InMemoryLogBuffer {
    fn add_entry(&self, entry: LogEntry) {
        self.lock().push(entry);
    }

    fn drain(&self) -> Vec<LogEntry> {
        self.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_core::domain::log::LogLevel;

    #[test]
    fn test_drain_empties_buffer() {
        let buffer = InMemoryLogBuffer::new();
        buffer.add_entry(LogEntry::info("one"));
        buffer.add_entry(LogEntry::error("two"));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].level, LogLevel::Error);
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let buffer = InMemoryLogBuffer::new();
        let shared = buffer.clone();
        shared.add_entry(LogEntry::info("from clone"));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message, "from clone");
        assert!(shared.drain().is_empty());
    }
}
