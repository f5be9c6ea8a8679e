//! The alias table and the (deliberately non-recursive) expansion rules
//! that use it. Expansion happens in two places: once against the raw
//! line's first word before tokenization, and once per-`Command` after
//! parsing for every pipeline segment after the first (whose `argv[0]`
//! already went through the first pass) — see
//! [`crate::shell::Shell::expand_line`] and
//! [`crate::shell::Shell::expand_command_aliases`].

use std::collections::HashMap;

/// `name -> value` table; unique by name, replaces on re-add.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.entries.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// All entries sorted by name, for the `alias`/`aliases` builtins.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_by_key(|(k, _)| *k);
        pairs
    }
}

/// Expand the first word of a raw input line against `table`, once
/// (non-recursive — the replacement's own first word is never re-checked).
/// Returns the line unchanged if the first word has no alias.
pub fn expand_first_word(line: &str, table: &AliasTable) -> String {
    let trimmed = line.trim_start();
    let (first, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest),
        None => (trimmed, ""),
    };

    match table.get(first) {
        Some(value) => {
            if rest.trim().is_empty() {
                value.to_string()
            } else {
                format!("{value} {rest}")
            }
        }
        None => line.to_string(),
    }
}
