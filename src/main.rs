mod alias;
mod builtins;
mod error;
mod executor;
mod history;
mod job_control;
mod jobs;
mod limits;
mod parser;
mod paths;
mod shell;
mod signals;
mod status;
mod tokenizer;

mod editor;

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;

use editor::LineEditor;
use shell::Shell;
use signals::SignalState;

/// An interactive Unix shell with job control.
#[derive(Parser, Debug)]
#[command(name = "mysh", about = "An interactive Unix shell with job control")]
struct Cli {
    /// Execute COMMAND instead of reading from stdin, then exit.
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,

    /// Skip loading $HOME/.mysh_rc.
    #[arg(long)]
    norc: bool,

    /// Raise tracing verbosity (repeatable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Script file to execute line-by-line instead of entering the REPL.
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let signals = SignalState::new();
    if let Err(e) = signals.install() {
        tracing::warn!(error = %e, "failed to install signal handling");
    }
    claim_terminal();

    let mut shell = Shell::new(current_pgid());

    if !cli.norc {
        load_rc_file(&mut shell, &signals);
    }

    let exit_code = if let Some(command) = &cli.command {
        let outcome = run_line(command, &mut shell, &signals, false);
        shell.persist_all();
        outcome_code(outcome)
    } else if let Some(script) = &cli.script {
        run_script(script, &mut shell, &signals)
    } else {
        run_interactive(&mut shell, &signals)
    };

    std::process::exit(exit_code);
}

#[cfg(unix)]
fn claim_terminal() {
    unsafe {
        libc::setpgid(0, 0);
        let pgid = libc::getpgrp();
        if libc::isatty(libc::STDIN_FILENO) == 1 {
            libc::tcsetpgrp(libc::STDIN_FILENO, pgid);
        }
    }
}

#[cfg(not(unix))]
fn claim_terminal() {}

#[cfg(unix)]
fn current_pgid() -> jobs::Pid {
    unsafe { libc::getpgrp() }
}

#[cfg(not(unix))]
fn current_pgid() -> jobs::Pid {
    0
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_rc_file(shell: &mut Shell, signals: &SignalState) {
    let rc_path = paths::home_dir().join(".mysh_rc");
    let Ok(contents) = std::fs::read_to_string(&rc_path) else {
        return;
    };
    for line in contents.lines() {
        run_line(line, shell, signals, false);
    }
}

fn run_script(path: &std::path::Path, shell: &mut Shell, signals: &SignalState) -> i32 {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("mysh: {}: {e}", path.display());
            return 1;
        }
    };
    let mut last_code = 0;
    for line in io::BufReader::new(file).lines() {
        let Ok(line) = line else { break };
        match run_line(&line, shell, signals, false) {
            executor::Outcome::Continue(code) => last_code = code,
            executor::Outcome::Exit(code) => {
                shell.persist_all();
                return code;
            }
        }
    }
    shell.persist_all();
    last_code
}

fn run_interactive(shell: &mut Shell, signals: &SignalState) -> i32 {
    let history_snapshot: Vec<String> =
        shell.history.iter_indexed().map(|(_, l)| l.to_string()).collect();
    let mut editor = LineEditor::from_history(history_snapshot);
    let mut last_code = 0;

    loop {
        shell.jobs.sweep_done();
        signals.drain(&mut shell.jobs);

        match editor.read_line("mysh> ") {
            Ok(Some(line)) => {
                editor.add_to_history(&line);
                match run_line(&line, shell, signals, true) {
                    executor::Outcome::Continue(code) => last_code = code,
                    executor::Outcome::Exit(code) => {
                        shell.persist_all();
                        return code;
                    }
                }
            }
            Ok(None) => {
                shell.persist_all();
                return last_code;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("mysh: error reading input: {e}");
                shell.persist_all();
                return 1;
            }
        }
    }
}

fn outcome_code(outcome: executor::Outcome) -> i32 {
    match outcome {
        executor::Outcome::Continue(code) => code,
        executor::Outcome::Exit(code) => code,
    }
}

/// Shared per-line handling for interactive input, rc-file lines, script
/// lines, and `-c COMMAND`: history-bang expansion, preview mode (a
/// trailing `?`), then the normal expand→execute pipeline.
fn run_line(
    raw: &str,
    shell: &mut Shell,
    signals: &SignalState,
    record_history: bool,
) -> executor::Outcome {
    let line = raw.trim();
    if line.is_empty() {
        return executor::Outcome::Continue(0);
    }

    if let Some(rest) = line.strip_prefix('!') {
        return match rest.parse::<usize>() {
            Ok(k) => match shell.history.get(k).map(str::to_string) {
                Some(expanded) => {
                    println!("{expanded}");
                    run_line(&expanded, shell, signals, record_history)
                }
                None => {
                    eprintln!("mysh: !{k}: event not found");
                    executor::Outcome::Continue(1)
                }
            },
            Err(_) => {
                eprintln!("mysh: {line}: event not found");
                executor::Outcome::Continue(1)
            }
        };
    }

    if let Some(stripped) = line.strip_suffix('?') {
        for tok in shell.preview_tokens(stripped.trim_end()) {
            println!("{tok:?}");
        }
        return executor::Outcome::Continue(0);
    }

    if record_history {
        shell.history.push(line);
    }

    let pipeline = shell.expand_line(line);
    executor::execute_pipeline(&pipeline, line, shell, signals)
}
