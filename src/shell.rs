//! The `Shell` value: owns every piece of state that lives for the whole
//! session (aliases, shell variables, history, job table) and the
//! load/save/expand operations that stitch them together. Mutated only
//! from the main loop — the signal reaper touches the job table through
//! [`crate::signals::SignalState`], never through `Shell` directly.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::alias::{self, AliasTable};
use crate::error::ShellError;
use crate::history::HistoryRing;
use crate::jobs::JobTable;
use crate::parser::{self, Pipeline};
use crate::paths;
use crate::tokenizer::{self, Token};

pub struct Shell {
    pub aliases: AliasTable,
    pub vars: HashMap<String, String>,
    pub history: HistoryRing,
    pub jobs: JobTable,
    pub last_exit_code: i32,
    pub shell_pgid: crate::jobs::Pid,
    history_path: PathBuf,
    config_path: PathBuf,
}

impl Shell {
    /// Build a shell with its persistence paths rooted at `$HOME`, loading
    /// any existing history/config from disk. Used by `main`.
    pub fn new(shell_pgid: crate::jobs::Pid) -> Self {
        let home = paths::home_dir();
        let history_path = home.join(".mysh_history");
        let config_path = derive_config_path(&history_path);

        let mut shell = Shell {
            aliases: AliasTable::new(),
            vars: HashMap::new(),
            history: HistoryRing::load(&history_path),
            jobs: JobTable::new(),
            last_exit_code: 0,
            shell_pgid,
            history_path,
            config_path,
        };
        shell.load_config();
        shell
    }

    /// A shell with no persistence paths touched on disk, for unit tests
    /// that only need `tokenize`/`parse` plumbing (shell vars, mainly).
    pub fn for_test() -> Self {
        Shell {
            aliases: AliasTable::new(),
            vars: HashMap::new(),
            history: HistoryRing::new(),
            jobs: JobTable::new(),
            last_exit_code: 0,
            shell_pgid: 0,
            history_path: PathBuf::new(),
            config_path: PathBuf::new(),
        }
    }

    pub fn history_path(&self) -> &std::path::Path {
        &self.history_path
    }

    /// Shell variable first, then process environment, else empty —
    /// the precedence the tokenizer's `$VAR` expansion relies on.
    pub fn lookup_var(&self, name: &str) -> String {
        if let Some(value) = self.vars.get(name) {
            return value.clone();
        }
        std::env::var(name).unwrap_or_default()
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn unset_var(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    /// Full expansion pipeline for one raw input line: first-word alias
    /// expansion, tokenize, parse, then per-`Command` alias re-expansion.
    pub fn expand_line(&self, line: &str) -> Pipeline {
        let expanded = alias::expand_first_word(line, &self.aliases);
        let tokens = tokenizer::tokenize(&expanded, self);
        let pipeline = parser::parse(&tokens);
        // The first command's argv[0] was already substituted above by
        // `expand_first_word`; re-matching it here would expand it twice
        // (`alias a="a b"` + `a c` → `a b c`, not `a b b c`). Only the
        // commands after the first pipe stage still need this pass.
        self.expand_command_aliases(pipeline, 1)
    }

    /// Same as [`expand_line`](Self::expand_line) but stops after
    /// tokenizing, for the `?`-suffixed preview-mode builtin.
    pub fn preview_tokens(&self, line: &str) -> Vec<Token> {
        let expanded = alias::expand_first_word(line, &self.aliases);
        tokenizer::tokenize(&expanded, self)
    }

    /// Re-expand aliases per-`Command`, starting at `skip`: any command at
    /// or past that index whose `argv[0]` matches an alias has that word
    /// replaced by the alias value (re-tokenized) spliced in place of
    /// `argv[0]`, non-recursively. `skip` is 1 from `expand_line` since the
    /// first command's `argv[0]` already went through `expand_first_word`
    /// on the raw line; a pipeline segment after the first `|` never did.
    fn expand_command_aliases(&self, mut pipeline: Pipeline, skip: usize) -> Pipeline {
        for command in pipeline.commands.iter_mut().skip(skip) {
            let Some(first) = command.argv.first().cloned() else {
                continue;
            };
            if let Some(value) = self.aliases.get(&first) {
                let mut replacement: Vec<String> = value
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                replacement.extend(command.argv.drain(1..));
                command.argv = replacement;
            }
        }
        pipeline
    }

    fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }

    /// Load `alias NAME=VALUE` / `set NAME=VALUE` lines from the config
    /// file, if it exists. Malformed lines are skipped, not fatal.
    fn load_config(&mut self) {
        let Ok(contents) = std::fs::read_to_string(self.config_path()) else {
            return;
        };
        for line in contents.lines() {
            if let Some(rest) = line.strip_prefix("alias ") {
                if let Some((name, value)) = rest.split_once('=') {
                    self.aliases.set(name, value);
                }
            } else if let Some(rest) = line.strip_prefix("set ") {
                if let Some((name, value)) = rest.split_once('=') {
                    self.set_var(name, value);
                }
            }
        }
    }

    /// Rewrite the config file whole: alternating `alias NAME=VALUE` /
    /// `set NAME=VALUE` lines, per the documented file contract.
    pub fn save_config(&self) -> Result<(), ShellError> {
        use std::io::Write as _;
        let path = self.config_path();
        let mut file = std::fs::File::create(path)
            .map_err(|e| ShellError::PersistenceFailure(path.display().to_string(), e))?;
        for (name, value) in self.aliases.sorted() {
            writeln!(file, "alias {name}={value}")
                .map_err(|e| ShellError::PersistenceFailure(path.display().to_string(), e))?;
        }
        let mut vars: Vec<_> = self.vars.iter().collect();
        vars.sort_by_key(|(k, _)| (*k).clone());
        for (name, value) in vars {
            writeln!(file, "set {name}={value}")
                .map_err(|e| ShellError::PersistenceFailure(path.display().to_string(), e))?;
        }
        Ok(())
    }

    pub fn save_history(&self) -> Result<(), ShellError> {
        self.history.save(&self.history_path)
    }

    /// Persist both history and config. Called by the `exit` builtin and
    /// on EOF. Failures are logged, never fatal, per the spec's
    /// `PersistenceFailure` policy.
    pub fn persist_all(&self) {
        if let Err(e) = self.save_history() {
            tracing::warn!(error = %e, "failed to save history");
        }
        if let Err(e) = self.save_config() {
            tracing::warn!(error = %e, "failed to save config");
        }
    }
}

/// `<history_path>_config`, unconditionally — see `SPEC_FULL.md` §6/§9 on
/// why the dot-suffix branch from the original derivation is not
/// reproduced.
fn derive_config_path(history_path: &std::path::Path) -> PathBuf {
    let mut s = history_path.as_os_str().to_os_string();
    s.push("_config");
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_precedence_shell_before_env() {
        let mut shell = Shell::for_test();
        unsafe { std::env::set_var("MYSH_TEST_PRECEDENCE", "from-env") };
        shell.set_var("MYSH_TEST_PRECEDENCE", "from-shell");
        assert_eq!(shell.lookup_var("MYSH_TEST_PRECEDENCE"), "from-shell");
    }

    #[test]
    fn var_falls_back_to_env_then_empty() {
        let shell = Shell::for_test();
        unsafe { std::env::remove_var("MYSH_TEST_UNSET_VAR") };
        assert_eq!(shell.lookup_var("MYSH_TEST_UNSET_VAR"), "");
    }

    #[test]
    fn per_command_alias_expansion_is_non_recursive() {
        let mut shell = Shell::for_test();
        shell.aliases.set("a", "a b");
        let pipeline = shell.expand_line("a c");
        assert_eq!(pipeline.commands[0].argv, vec!["a", "b", "c"]);
    }

    #[test]
    fn self_referencing_alias_does_not_duplicate_flags() {
        let mut shell = Shell::for_test();
        shell.aliases.set("ls", "ls -la");
        let pipeline = shell.expand_line("ls foo");
        assert_eq!(pipeline.commands[0].argv, vec!["ls", "-la", "foo"]);
    }

    #[test]
    fn alias_expands_on_later_pipeline_segments() {
        let mut shell = Shell::for_test();
        shell.aliases.set("grepit", "grep -i");
        let pipeline = shell.expand_line("ls -la | grepit foo");
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(pipeline.commands[1].argv, vec!["grep", "-i", "foo"]);
    }

    #[test]
    fn config_round_trips_aliases_and_vars() {
        let dir = tempfile::tempdir().unwrap();
        let history_path = dir.path().join("hist");
        let config_path = derive_config_path(&history_path);

        let mut shell = Shell {
            aliases: AliasTable::new(),
            vars: HashMap::new(),
            history: HistoryRing::new(),
            jobs: JobTable::new(),
            last_exit_code: 0,
            shell_pgid: 0,
            history_path,
            config_path,
        };
        shell.aliases.set("ll", "ls -l");
        shell.set_var("X", "42");
        shell.save_config().unwrap();

        let mut reloaded = Shell::for_test();
        reloaded.config_path = shell.config_path.clone();
        reloaded.load_config();
        assert_eq!(reloaded.aliases.get("ll"), Some("ls -l"));
        assert_eq!(reloaded.lookup_var("X"), "42");
    }

    #[test]
    fn config_path_derivation_appends_suffix() {
        let path = derive_config_path(&PathBuf::from("/home/u/.mysh_history"));
        assert_eq!(path, PathBuf::from("/home/u/.mysh_history_config"));
    }
}
