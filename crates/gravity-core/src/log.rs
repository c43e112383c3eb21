use serde::{Deserialize, Serialize};

use crate::time::clock_time_now;

/// Severity tiers of the fleet log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
}

/// One line of the fleet log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequence number within the session, starting at 1.
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    /// Wall-clock `HH:MM:SS` at emission.
    pub timestamp: String,
    /// Zero-based pipeline step that produced the line, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
}

/// Append-only, emission-ordered log feed.
#[derive(Debug, Clone, Default)]
pub struct LogFeed {
    entries: Vec<LogEntry>,
}

impl LogFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and return a copy of what was stored.
    pub fn push(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        step: Option<usize>,
    ) -> LogEntry {
        let entry = LogEntry {
            id: self.entries.len() as u64 + 1,
            message: message.into(),
            severity,
            timestamp: clock_time_now(),
            step,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines emitted by pipeline steps, in step order.
    pub fn step_entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.step.is_some())
    }
}
