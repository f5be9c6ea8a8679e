//! Fold a [`Token`] stream into a [`Pipeline`] of [`Command`]s. The parser
//! never fails: malformed input (a dangling redirection operator, an empty
//! segment between two pipes) produces a best-effort `Pipeline` rather than
//! an error, matching the interactive-shell tradeoff documented in the spec.

use crate::tokenizer::Token;

/// One external or builtin command within a pipeline, with its argv and
/// at most one input and one output redirection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub argv: Vec<String>,
    pub infile: Option<String>,
    pub outfile: Option<OutputRedirect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRedirect {
    pub path: String,
    pub append: bool,
}

impl Command {
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

/// An ordered sequence of one or more [`Command`]s connected by pipes,
/// plus whether the whole pipeline should run in the background.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub background: bool,
}

impl Pipeline {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Fold `tokens` into a `Pipeline`.
///
/// - `|` closes the current command and opens a new one.
/// - `<` / `>` / `>>` consume the next token as a path; a redirection with
///   no following token is silently dropped (the operator is ignored).
/// - `&` sets `background = true`, regardless of where it appears.
/// - A later redirection of the same direction overwrites an earlier one.
/// - Empty commands between consecutive pipes are dropped.
pub fn parse(tokens: &[Token]) -> Pipeline {
    let mut pipeline = Pipeline::default();
    let mut current = Command::default();
    let mut iter = tokens.iter().peekable();

    while let Some(tok) = iter.next() {
        match tok {
            Token::Word(w) => current.argv.push(w.clone()),
            Token::Pipe => {
                if !current.is_empty() {
                    pipeline.commands.push(std::mem::take(&mut current));
                }
            }
            Token::Lt => {
                if let Some(Token::Word(path)) = iter.peek() {
                    current.infile = Some(path.clone());
                    iter.next();
                }
            }
            Token::Gt => {
                if let Some(Token::Word(path)) = iter.peek() {
                    current.outfile = Some(OutputRedirect {
                        path: path.clone(),
                        append: false,
                    });
                    iter.next();
                }
            }
            Token::Append => {
                if let Some(Token::Word(path)) = iter.peek() {
                    current.outfile = Some(OutputRedirect {
                        path: path.clone(),
                        append: true,
                    });
                    iter.next();
                }
            }
            Token::Amp => {
                pipeline.background = true;
            }
        }
    }

    if !current.is_empty() {
        pipeline.commands.push(current);
    }

    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Shell;
    use crate::tokenizer::tokenize;

    fn parse_line(input: &str) -> Pipeline {
        let shell = Shell::for_test();
        parse(&tokenize(input, &shell))
    }

    #[test]
    fn single_command() {
        let p = parse_line("echo hello world");
        assert_eq!(p.commands.len(), 1);
        assert_eq!(p.commands[0].argv, vec!["echo", "hello", "world"]);
        assert!(!p.background);
    }

    #[test]
    fn pipeline_splits_on_pipe() {
        let p = parse_line("cat file | grep foo | wc -l");
        assert_eq!(p.commands.len(), 3);
        assert_eq!(p.commands[0].argv, vec!["cat", "file"]);
        assert_eq!(p.commands[1].argv, vec!["grep", "foo"]);
        assert_eq!(p.commands[2].argv, vec!["wc", "-l"]);
    }

    #[test]
    fn background_flag_set_by_trailing_amp() {
        let p = parse_line("sleep 5 &");
        assert!(p.background);
        assert_eq!(p.commands[0].argv, vec!["sleep", "5"]);
    }

    #[test]
    fn background_flag_is_position_insensitive() {
        let p = parse_line("sleep 5 & ");
        assert!(p.background);
    }

    #[test]
    fn redirections_attach_to_command() {
        let p = parse_line("sort < in.txt > out.txt");
        assert_eq!(p.commands[0].argv, vec!["sort"]);
        assert_eq!(p.commands[0].infile, Some("in.txt".to_string()));
        assert_eq!(
            p.commands[0].outfile,
            Some(OutputRedirect {
                path: "out.txt".to_string(),
                append: false
            })
        );
    }

    #[test]
    fn append_redirection() {
        let p = parse_line("echo hi >> out.txt");
        assert_eq!(
            p.commands[0].outfile,
            Some(OutputRedirect {
                path: "out.txt".to_string(),
                append: true
            })
        );
    }

    #[test]
    fn later_redirection_overwrites_earlier() {
        let p = parse_line("echo hi > a.txt > b.txt");
        assert_eq!(
            p.commands[0].outfile,
            Some(OutputRedirect {
                path: "b.txt".to_string(),
                append: false
            })
        );
    }

    #[test]
    fn dangling_redirection_is_ignored() {
        let p = parse_line("echo hi >");
        assert_eq!(p.commands[0].argv, vec!["echo", "hi"]);
        assert_eq!(p.commands[0].outfile, None);
    }

    #[test]
    fn empty_commands_between_pipes_are_dropped() {
        let p = parse_line("echo hi | | wc -l");
        assert_eq!(p.commands.len(), 2);
        assert_eq!(p.commands[0].argv, vec!["echo", "hi"]);
        assert_eq!(p.commands[1].argv, vec!["wc", "-l"]);
    }

    #[test]
    fn empty_input_yields_empty_pipeline() {
        let p = parse_line("");
        assert!(p.is_empty());
    }
}
