//! Capped, newest-first history of past runs

use std::collections::VecDeque;
use std::path::Path;

use tracing::{debug, warn};

use consoleqa_common::RunHistoryEntry;

use crate::error::E2eResult;

/// Number of runs retained
pub const MAX_HISTORY: usize = 100;

/// Run summaries, newest first, never longer than `capacity`
#[derive(Debug, Clone, PartialEq)]
pub struct RunHistory {
    entries: VecDeque<RunHistoryEntry>,
    capacity: usize,
}

impl RunHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Wrap existing entries (assumed newest first), dropping any overflow
    pub fn from_entries(entries: Vec<RunHistoryEntry>, capacity: usize) -> Self {
        let mut entries = VecDeque::from(entries);
        entries.truncate(capacity);
        Self { entries, capacity }
    }

    /// Load the history file.
    ///
    /// A missing, unreadable or corrupt file is an empty history.
    pub fn load(path: &Path, capacity: usize) -> Self {
        if !path.exists() {
            debug!("No history at {}, starting fresh", path.display());
            return Self::new(capacity);
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<Vec<RunHistoryEntry>>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(entries) => Self::from_entries(entries, capacity),
            Err(e) => {
                warn!("Ignoring unreadable history {}: {}", path.display(), e);
                Self::new(capacity)
            }
        }
    }

    /// Prepend `entry`, then drop everything past the capacity
    pub fn insert(&mut self, entry: RunHistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunHistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn newest(&self) -> Option<&RunHistoryEntry> {
        self.entries.front()
    }

    /// Overwrite the history file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use consoleqa_common::RunSummary;

    fn entry(n: usize) -> RunHistoryEntry {
        RunHistoryEntry {
            id: format!("run-{n}"),
            started_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            duration_ms: n as u64,
            summary: RunSummary::default(),
            pass_rate: 0,
            modules: Default::default(),
        }
    }

    #[test]
    fn test_insert_then_cap_keeps_newest_first() {
        let mut history = RunHistory::new(MAX_HISTORY);
        for n in 0..150 {
            history.insert(entry(n));
        }

        assert_eq!(history.len(), MAX_HISTORY);
        let ids: Vec<_> = history.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.first().map(String::as_str), Some("run-149"));
        assert_eq!(ids.last().map(String::as_str), Some("run-50"));
        let expected: Vec<_> = (50..150).rev().map(|n| format!("run-{n}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_corrupt_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let history = RunHistory::load(&path, MAX_HISTORY);
        assert!(history.is_empty());
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = RunHistory::load(&dir.path().join("absent.json"), MAX_HISTORY);
        assert!(history.is_empty());
    }

    #[test]
    fn test_oversized_file_is_capped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/runs.json");
        RunHistory::from_entries((0..10).map(entry).collect(), 10)
            .save(&path)
            .unwrap();

        let history = RunHistory::load(&path, 3);
        assert_eq!(history.len(), 3);
        assert_eq!(history.newest().map(|e| e.id.as_str()), Some("run-0"));
    }
}
