use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::Clock;

/// How long a history entry is kept.
pub const HISTORY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on entries returned for one session.
pub const MAX_HISTORY_ENTRIES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub url: String,
    pub session_id: String,
    pub timestamp: u64,
}

/// Per-session log of requested links.
///
/// Entries are keyed by session and URL, so asking for the same link again
/// refreshes its timestamp instead of adding a row.
pub struct RequestHistory {
    entries: Mutex<HashMap<String, HistoryEntry>>,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl RequestHistory {
    pub fn new(clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            retention,
            clock,
        }
    }

    pub fn record(&self, session_id: &str, url: &str) {
        let entry = HistoryEntry {
            url: url.to_string(),
            session_id: session_id.to_string(),
            timestamp: self.clock.now_ms(),
        };
        self.entries
            .lock()
            .insert(format!("{session_id}-{url}"), entry);
    }

    /// Newest first, at most [`MAX_HISTORY_ENTRIES`].
    pub fn for_session(&self, session_id: &str) -> Vec<HistoryEntry> {
        let mut matching: Vec<HistoryEntry> = self
            .entries
            .lock()
            .values()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(MAX_HISTORY_ENTRIES);
        matching
    }

    /// Drops entries older than the retention window; returns how many.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let retention_ms = self.retention.as_millis() as u64;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_sub(e.timestamp) <= retention_ms);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
