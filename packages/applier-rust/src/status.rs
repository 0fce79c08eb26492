//! Per-call apply context and task-status sinks.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::traits::TaskStatusSink;

/// Context passed into every executor call: which task the work belongs to
/// and where its failures are reported.
#[derive(Clone)]
pub struct ApplyContext {
    pub task_id: String,
    pub status: Arc<dyn TaskStatusSink>,
}

impl ApplyContext {
    pub fn new(task_id: impl Into<String>, status: Arc<dyn TaskStatusSink>) -> Self {
        Self {
            task_id: task_id.into(),
            status,
        }
    }

    /// Records `message` as the task's last error.
    pub fn record_error(&self, message: &str) {
        self.status.record_last_error(&self.task_id, message);
    }
}

impl fmt::Debug for ApplyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyContext")
            .field("task_id", &self.task_id)
            .finish_non_exhaustive()
    }
}

/// In-process task-status store keyed by task id.
#[derive(Debug, Default)]
pub struct MemoryTaskStatus {
    last_errors: DashMap<String, String>,
}

impl MemoryTaskStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last error recorded for `task_id`, if any.
    #[must_use]
    pub fn last_error(&self, task_id: &str) -> Option<String> {
        self.last_errors.get(task_id).map(|e| e.value().clone())
    }
}

impl TaskStatusSink for MemoryTaskStatus {
    fn record_last_error(&self, task_id: &str, message: &str) {
        self.last_errors
            .insert(task_id.to_string(), message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_overwrites_previous() {
        let status = MemoryTaskStatus::new();
        status.record_last_error("task-1", "first");
        status.record_last_error("task-1", "second");
        assert_eq!(status.last_error("task-1").as_deref(), Some("second"));
        assert!(status.last_error("task-2").is_none());
    }

    #[test]
    fn context_records_under_its_task() {
        let status = Arc::new(MemoryTaskStatus::new());
        let ctx = ApplyContext::new("task-9", status.clone());
        ctx.record_error("boom");
        assert_eq!(status.last_error("task-9").as_deref(), Some("boom"));
    }

    #[test]
    fn debug_shows_task_id() {
        let ctx = ApplyContext::new("task-3", Arc::new(MemoryTaskStatus::new()));
        assert!(format!("{ctx:?}").contains("task-3"));
    }
}
