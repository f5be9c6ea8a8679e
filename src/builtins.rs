//! In-process implementations of shell built-ins plus the `fg`/`bg`/`jobs`/
//! `wait` job-control commands. Builtins execute directly against `Shell`
//! when a pipeline takes the single-builtin fast path (see
//! [`crate::executor`]); when a builtin is mid-pipeline, backgrounded, or
//! redirected it instead runs inside the forked child, against that
//! process's own private copy of `Shell` — mutations there (e.g. `cd`)
//! never escape back to the parent shell, matching real shell behavior.

use std::io::Write as _;

use crate::jobs::JobState;
use crate::paths;
use crate::shell::Shell;
use crate::signals::SignalState;

pub enum BuiltinOutcome {
    Continue(i32),
    Exit(i32),
}

const NAMES: &[&str] = &[
    "cd", "exit", "mkdir", "touch", "clear", "history", "histsearch", "jobs", "fg", "bg",
    "alias", "unalias", "unset", "set", "vars", "aliases", "pwd", "echo", "export", "type",
    "wait",
];

pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

pub fn execute(argv: &[String], shell: &mut Shell, signals: &SignalState) -> BuiltinOutcome {
    let Some(name) = argv.first() else {
        return BuiltinOutcome::Continue(0);
    };
    let args = &argv[1..];

    match name.as_str() {
        "cd" => BuiltinOutcome::Continue(cd(args)),
        "exit" => {
            shell.persist_all();
            BuiltinOutcome::Exit(0)
        }
        "mkdir" => BuiltinOutcome::Continue(mkdir(args)),
        "touch" => BuiltinOutcome::Continue(touch(args)),
        "clear" => {
            print!("\x1B[H\x1B[2J");
            let _ = std::io::stdout().flush();
            BuiltinOutcome::Continue(0)
        }
        "history" => {
            for (idx, line) in shell.history.iter_indexed() {
                println!("{idx}  {line}");
            }
            BuiltinOutcome::Continue(0)
        }
        "histsearch" => BuiltinOutcome::Continue(histsearch(args, shell)),
        "jobs" => {
            for job in shell.jobs.jobs_sorted() {
                println!("[{}]  {:?}  {}", job.id, job.state, job.cmdline);
            }
            shell.jobs.sweep_done();
            BuiltinOutcome::Continue(0)
        }
        "fg" => BuiltinOutcome::Continue(fg(args, shell, signals)),
        "bg" => BuiltinOutcome::Continue(bg(args, shell)),
        "alias" => BuiltinOutcome::Continue(alias_cmd(args, shell)),
        "unalias" => BuiltinOutcome::Continue(unalias(args, shell)),
        "unset" => BuiltinOutcome::Continue(unset(args, shell)),
        "set" => BuiltinOutcome::Continue(set(args, shell)),
        "vars" => {
            let mut entries: Vec<_> = shell.vars.iter().collect();
            entries.sort_by_key(|(k, _)| (*k).clone());
            for (name, value) in entries {
                println!("{name}={value}");
            }
            BuiltinOutcome::Continue(0)
        }
        "aliases" => {
            for (name, value) in shell.aliases.sorted() {
                println!("{name}={value}");
            }
            BuiltinOutcome::Continue(0)
        }
        "pwd" => BuiltinOutcome::Continue(pwd()),
        "echo" => {
            println!("{}", args.join(" "));
            BuiltinOutcome::Continue(0)
        }
        "export" => BuiltinOutcome::Continue(export(args)),
        "type" => BuiltinOutcome::Continue(type_cmd(args)),
        "wait" => BuiltinOutcome::Continue(wait_cmd(args, shell)),
        _ => {
            eprintln!("mysh: {name}: not a builtin");
            BuiltinOutcome::Continue(1)
        }
    }
}

fn cd(args: &[String]) -> i32 {
    let target = match args.first() {
        Some(dir) => paths::expand_tilde(dir),
        None => paths::home_dir().display().to_string(),
    };
    match std::env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("mysh: cd: {target}: {e}");
            1
        }
    }
}

fn mkdir(paths_arg: &[String]) -> i32 {
    if paths_arg.is_empty() {
        eprintln!("mysh: mkdir: missing operand");
        return 1;
    }
    let mut status = 0;
    for path in paths_arg {
        let result = {
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                std::fs::DirBuilder::new().mode(0o755).create(path)
            }
            #[cfg(not(unix))]
            {
                std::fs::create_dir(path)
            }
        };
        if let Err(e) = result {
            eprintln!("mysh: mkdir: {path}: {e}");
            status = 1;
        }
    }
    status
}

fn touch(paths_arg: &[String]) -> i32 {
    if paths_arg.is_empty() {
        eprintln!("mysh: touch: missing operand");
        return 1;
    }
    let mut status = 0;
    for path in paths_arg {
        let mut opts = std::fs::OpenOptions::new();
        opts.create(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o644);
        }
        if let Err(e) = opts.open(path) {
            eprintln!("mysh: touch: {path}: {e}");
            status = 1;
        }
    }
    status
}

fn histsearch(args: &[String], shell: &Shell) -> i32 {
    let Some(term) = args.first() else {
        eprintln!("mysh: histsearch: usage: histsearch TERM");
        return 1;
    };
    for (idx, line) in shell.history.search(term) {
        println!("{idx}  {line}");
    }
    0
}

fn alias_cmd(args: &[String], shell: &mut Shell) -> i32 {
    if args.is_empty() {
        for (name, value) in shell.aliases.sorted() {
            println!("{name}={value}");
        }
        return 0;
    }
    let name = &args[0];
    let value = args[1..].join(" ");
    shell.aliases.set(name, &value);
    0
}

fn unalias(args: &[String], shell: &mut Shell) -> i32 {
    let Some(name) = args.first() else {
        eprintln!("mysh: unalias: usage: unalias NAME");
        return 1;
    };
    if shell.aliases.remove(name) {
        0
    } else {
        eprintln!("mysh: unalias: {name}: not found");
        1
    }
}

fn unset(args: &[String], shell: &mut Shell) -> i32 {
    let Some(name) = args.first() else {
        eprintln!("mysh: unset: usage: unset NAME");
        return 1;
    };
    if shell.unset_var(name) {
        0
    } else {
        eprintln!("mysh: unset: {name}: not found");
        1
    }
}

fn set(args: &[String], shell: &mut Shell) -> i32 {
    if args.len() != 2 {
        let err = crate::error::ShellError::BuiltinUsage("set: usage: set NAME VALUE".into());
        eprintln!("mysh: {err}");
        return err.exit_code();
    }
    shell.set_var(&args[0], &args[1]);
    0
}

fn pwd() -> i32 {
    match std::env::current_dir() {
        Ok(dir) => {
            println!("{}", dir.display());
            0
        }
        Err(e) => {
            eprintln!("mysh: pwd: {e}");
            1
        }
    }
}

fn export(args: &[String]) -> i32 {
    if args.is_empty() {
        eprintln!("mysh: export: usage: export NAME=VALUE...");
        return 1;
    }
    let mut status = 0;
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => unsafe { std::env::set_var(name, value) },
            None => {
                eprintln!("mysh: export: {arg}: not NAME=VALUE");
                status = 1;
            }
        }
    }
    status
}

fn type_cmd(args: &[String]) -> i32 {
    if args.is_empty() {
        eprintln!("mysh: type: usage: type NAME...");
        return 1;
    }
    let mut status = 0;
    for name in args {
        if is_builtin(name) {
            println!("{name} is a shell builtin");
        } else if let Some(path) = resolve_in_path(name) {
            println!("{name} is {}", path.display());
        } else {
            println!("{name}: not found");
            status = 1;
        }
    }
    status
}

fn resolve_in_path(name: &str) -> Option<std::path::PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn fg(args: &[String], shell: &mut Shell, signals: &SignalState) -> i32 {
    let id = match args.first() {
        Some(raw) => match raw.parse::<usize>() {
            Ok(id) => Some(id),
            Err(_) => {
                eprintln!("mysh: fg: invalid job id: {raw}");
                return 1;
            }
        },
        None => shell.jobs.most_recent_stopped_id(),
    };
    let Some(id) = id else {
        eprintln!("mysh: fg: no such job");
        return 1;
    };
    let Some(pgid) = shell.jobs.get(id).map(|j| j.pgid) else {
        eprintln!("mysh: fg: {}", crate::error::ShellError::JobNotFound(id));
        return crate::error::ShellError::JobNotFound(id).exit_code();
    };

    shell.jobs.set_state(id, JobState::Running);
    if let Err(e) = crate::job_control::send_continue_to_group(pgid) {
        eprintln!("mysh: fg: failed to continue job {id}: {e}");
    }

    signals.set_foreground(pgid);
    let guard = crate::job_control::ForegroundTerminalGuard::new(pgid).ok();

    let outcome = crate::executor::wait_foreground_group(pgid, pgid);

    drop(guard);
    signals.clear_foreground();

    match outcome {
        crate::executor::ForegroundOutcome::Stopped => {
            shell.jobs.set_state(id, JobState::Stopped);
            println!("[{id}]  Stopped");
            0
        }
        crate::executor::ForegroundOutcome::Exited(code) => {
            shell.jobs.mark_done(pgid, code);
            code
        }
    }
}

fn bg(args: &[String], shell: &mut Shell) -> i32 {
    let id = match args.first() {
        Some(raw) => match raw.parse::<usize>() {
            Ok(id) => Some(id),
            Err(_) => {
                eprintln!("mysh: bg: invalid job id: {raw}");
                return 1;
            }
        },
        None => shell.jobs.most_recent_id(),
    };
    let Some(id) = id else {
        eprintln!("mysh: bg: no such job");
        return 1;
    };
    let Some(pgid) = shell.jobs.get(id).map(|j| j.pgid) else {
        eprintln!("mysh: bg: {}", crate::error::ShellError::JobNotFound(id));
        return crate::error::ShellError::JobNotFound(id).exit_code();
    };

    if let Err(e) = crate::job_control::send_continue_to_group(pgid) {
        eprintln!("mysh: bg: failed to continue job {id}: {e}");
        return 1;
    }
    shell.jobs.set_state(id, JobState::Running);
    0
}

fn wait_cmd(args: &[String], shell: &mut Shell) -> i32 {
    let ids: Vec<usize> = match args.first() {
        Some(raw) => match raw.parse::<usize>() {
            Ok(id) => vec![id],
            Err(_) => {
                eprintln!("mysh: wait: invalid job id: {raw}");
                return 1;
            }
        },
        None => shell.jobs.running_ids(),
    };

    let mut last_code = 0;
    for id in ids {
        let Some(pgid) = shell.jobs.get(id).map(|j| j.pgid) else {
            eprintln!("mysh: wait: {}", crate::error::ShellError::JobNotFound(id));
            return crate::error::ShellError::JobNotFound(id).exit_code();
        };
        match crate::executor::wait_foreground_group(pgid, pgid) {
            crate::executor::ForegroundOutcome::Exited(code) => {
                shell.jobs.mark_done(pgid, code);
                last_code = code;
            }
            crate::executor::ForegroundOutcome::Stopped => {
                shell.jobs.set_state(id, JobState::Stopped);
            }
        }
    }
    last_code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_documented_builtin() {
        for name in NAMES {
            assert!(is_builtin(name));
        }
        assert!(!is_builtin("ls"));
    }

    #[test]
    fn alias_with_no_args_lists_sorted() {
        let mut shell = Shell::for_test();
        shell.aliases.set("z", "last");
        shell.aliases.set("a", "first");
        assert_eq!(alias_cmd(&[], &mut shell), 0);
    }

    #[test]
    fn set_requires_two_args() {
        let mut shell = Shell::for_test();
        assert_eq!(set(&["X".to_string()], &mut shell), 1);
        assert_eq!(set(&["X".to_string(), "1".to_string()], &mut shell), 0);
        assert_eq!(shell.lookup_var("X"), "1");
    }

    #[test]
    fn unset_reports_missing_name() {
        let mut shell = Shell::for_test();
        assert_eq!(unset(&["NOPE".to_string()], &mut shell), 1);
    }
}
