//! Bounded, deduped ring of recently entered command lines, with a plain
//! load/save contract to `$HOME/.mysh_history`.

use std::io::Write;
use std::path::Path;

use crate::error::ShellError;
use crate::limits::HISTORY_CAPACITY;

#[derive(Debug, Default)]
pub struct HistoryRing {
    entries: Vec<String>,
}

impl HistoryRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `line` unless it's empty or a repeat of the most recent entry.
    /// Evicts the oldest entry once the ring exceeds [`HISTORY_CAPACITY`].
    pub fn push(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.last().map(String::as_str) == Some(trimmed) {
            return;
        }
        self.entries.push(trimmed.to_string());
        if self.entries.len() > HISTORY_CAPACITY {
            let excess = self.entries.len() - HISTORY_CAPACITY;
            self.entries.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based lookup, matching the `!k` history-expansion and `history`
    /// builtin's displayed indices.
    pub fn get(&self, one_based: usize) -> Option<&str> {
        one_based
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .map(String::as_str)
    }

    pub fn iter_indexed(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().enumerate().map(|(i, s)| (i + 1, s.as_str()))
    }

    pub fn search(&self, term: &str) -> Vec<(usize, &str)> {
        self.iter_indexed()
            .filter(|(_, line)| line.contains(term))
            .collect()
    }

    pub fn load(path: &Path) -> Self {
        let mut ring = Self::new();
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                ring.push(line);
            }
        }
        ring
    }

    pub fn save(&self, path: &Path) -> Result<(), ShellError> {
        let mut file = std::fs::File::create(path)
            .map_err(|e| ShellError::PersistenceFailure(path.display().to_string(), e))?;
        for line in &self.entries {
            writeln!(file, "{line}")
                .map_err(|e| ShellError::PersistenceFailure(path.display().to_string(), e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_duplicates_suppressed() {
        let mut ring = HistoryRing::new();
        ring.push("ls");
        ring.push("ls");
        ring.push("ls");
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn non_consecutive_duplicates_kept() {
        let mut ring = HistoryRing::new();
        ring.push("ls");
        ring.push("pwd");
        ring.push("ls");
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn empty_lines_ignored() {
        let mut ring = HistoryRing::new();
        ring.push("");
        ring.push("   ");
        assert!(ring.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut ring = HistoryRing::new();
        for i in 0..HISTORY_CAPACITY + 10 {
            ring.push(&format!("cmd-{i}"));
        }
        assert_eq!(ring.len(), HISTORY_CAPACITY);
        assert_eq!(ring.get(1), Some(format!("cmd-{}", 10).as_str()));
    }

    #[test]
    fn one_based_lookup() {
        let mut ring = HistoryRing::new();
        ring.push("first");
        ring.push("second");
        assert_eq!(ring.get(1), Some("first"));
        assert_eq!(ring.get(2), Some("second"));
        assert_eq!(ring.get(3), None);
        assert_eq!(ring.get(0), None);
    }

    #[test]
    fn substring_search() {
        let mut ring = HistoryRing::new();
        ring.push("git commit -m foo");
        ring.push("ls -la");
        ring.push("git push");
        let hits = ring.search("git");
        assert_eq!(hits, vec![(1, "git commit -m foo"), (3, "git push")]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        let mut ring = HistoryRing::new();
        ring.push("echo one");
        ring.push("echo two");
        ring.save(&path).unwrap();

        let loaded = HistoryRing::load(&path);
        assert_eq!(loaded.get(1), Some("echo one"));
        assert_eq!(loaded.get(2), Some("echo two"));
    }
}
