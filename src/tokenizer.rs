//! Split a raw input line into [`Token`]s, honoring quoting/escaping and
//! expanding `$VAR` references. This is the tokenizer from the spec's
//! "HARD CORE" execution engine — deliberately permissive: malformed
//! input (unterminated quotes, a dangling `$`) never blocks or panics,
//! it just produces the best-effort token stream scanned so far.

use crate::limits::MAX_TOKENS;
use crate::shell::Shell;

/// One lexical unit of a command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    Pipe,
    Lt,
    Gt,
    Append,
    Amp,
}

/// A run of characters within a word, tagged with whether `$VAR`
/// expansion applies to it. Single-quoted runs are `Literal`; both
/// unquoted and double-quoted runs are `Expandable` (the spec scans
/// any non-single-quoted content for `$` after accumulation).
enum Segment {
    Literal(String),
    Expandable(String),
}

/// Tokenizer state machine. `Normal` is "between tokens"; the others track
/// what kind of token is currently being accumulated.
enum State {
    Normal,
    Word,
    DoubleQuote,
    SingleQuote,
}

/// Tokenize `input`, expanding `$VAR` references against `shell`'s
/// variable table (falling back to the process environment, then empty).
///
/// Operators (`|`, `<`, `>`, `>>`, `&`) are only recognized outside quotes
/// and outside an in-progress word; `>>` requires two adjacent `>` with
/// nothing between them. The token count is capped at [`MAX_TOKENS`];
/// anything past the cap is dropped silently rather than erroring.
pub fn tokenize(input: &str, shell: &Shell) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut segments: Vec<Segment> = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    macro_rules! flush_current_expandable {
        () => {
            if !current.is_empty() {
                segments.push(Segment::Expandable(std::mem::take(&mut current)));
            }
        };
    }

    macro_rules! push_word {
        () => {{
            flush_current_expandable!();
            if !segments.is_empty() {
                let word = std::mem::take(&mut segments)
                    .into_iter()
                    .map(|seg| match seg {
                        Segment::Literal(s) => s,
                        Segment::Expandable(s) => expand_vars(&s, shell),
                    })
                    .collect::<String>();
                tokens.push(Token::Word(word));
            }
        }};
    }

    while let Some(ch) = chars.next() {
        if tokens.len() >= MAX_TOKENS {
            break;
        }

        match (&state, ch) {
            (State::Normal, ' ' | '\t') => {}
            (State::Normal, '\'') => state = State::SingleQuote,
            (State::Normal, '"') => state = State::DoubleQuote,
            (State::Normal, '|') => tokens.push(Token::Pipe),
            (State::Normal, '&') => tokens.push(Token::Amp),
            (State::Normal, '<') => tokens.push(Token::Lt),
            (State::Normal, '>') => {
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::Append);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            (State::Normal, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                state = State::Word;
            }
            (State::Normal, c) => {
                current.push(c);
                state = State::Word;
            }

            (State::Word, ' ' | '\t') => {
                push_word!();
                state = State::Normal;
            }
            // Operators also terminate an in-progress unquoted word.
            (State::Word, '|') => {
                push_word!();
                tokens.push(Token::Pipe);
                state = State::Normal;
            }
            (State::Word, '&') => {
                push_word!();
                tokens.push(Token::Amp);
                state = State::Normal;
            }
            (State::Word, '<') => {
                push_word!();
                tokens.push(Token::Lt);
                state = State::Normal;
            }
            (State::Word, '>') => {
                push_word!();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::Append);
                } else {
                    tokens.push(Token::Gt);
                }
                state = State::Normal;
            }
            (State::Word, '\'') => {
                flush_current_expandable!();
                state = State::SingleQuote;
            }
            (State::Word, '"') => {
                flush_current_expandable!();
                state = State::DoubleQuote;
            }
            (State::Word, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (State::Word, c) => current.push(c),

            // Double quotes: `\x` inserts `x` verbatim for any `x`; `$VAR` expands.
            (State::DoubleQuote, '"') => {
                flush_current_expandable!();
                state = State::Word;
            }
            (State::DoubleQuote, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (State::DoubleQuote, c) => current.push(c),

            // Single quotes: fully literal, no escapes, no expansion.
            (State::SingleQuote, '\'') => {
                segments.push(Segment::Literal(std::mem::take(&mut current)));
                state = State::Word;
            }
            (State::SingleQuote, c) => current.push(c),
        }
    }

    // Unterminated quote: close silently and flush whatever was scanned.
    if matches!(state, State::SingleQuote) {
        segments.push(Segment::Literal(std::mem::take(&mut current)));
    }
    push_word!();

    tokens.truncate(MAX_TOKENS);
    tokens
}

/// Expand `$VAR`/`${VAR}` references in `text`. A `$` not followed by a
/// valid identifier start is left as a literal `$`.
fn expand_vars(text: &str, shell: &Shell) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        match chars.peek().copied() {
            Some('{') => {
                chars.next();
                let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
                result.push_str(&shell.lookup_var(&name));
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                result.push_str(&shell.lookup_var(&name));
            }
            _ => result.push('$'),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str) -> Vec<String> {
        let shell = Shell::for_test();
        tokenize(input, &shell)
            .into_iter()
            .filter_map(|t| match t {
                Token::Word(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn simple_words_round_trip() {
        assert_eq!(words("echo hello world"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn double_quotes_preserve_spaces_and_expand() {
        let mut shell = Shell::for_test();
        shell.set_var("X", "42");
        let tokens = tokenize(r#"echo "hi $X there""#, &shell);
        assert_eq!(
            tokens,
            vec![
                Token::Word("echo".into()),
                Token::Word("hi 42 there".into())
            ]
        );
    }

    #[test]
    fn single_quotes_are_fully_literal() {
        assert_eq!(
            words("echo '$HOME and spaces'"),
            vec!["echo", "$HOME and spaces"]
        );
    }

    #[test]
    fn mixed_quoting_expands_only_unquoted_and_double_quoted_parts() {
        let mut shell = Shell::for_test();
        shell.set_var("X", "42");
        let tokens = tokenize(r#"echo pre'$X'"$X"post$X"#, &shell);
        assert_eq!(
            tokens,
            vec![
                Token::Word("echo".into()),
                Token::Word("pre$X42post42".into()),
            ]
        );
    }

    #[test]
    fn operators_recognized_outside_quotes() {
        let shell = Shell::for_test();
        let tokens = tokenize("ls | wc -l > out.txt", &shell);
        assert_eq!(
            tokens,
            vec![
                Token::Word("ls".into()),
                Token::Pipe,
                Token::Word("wc".into()),
                Token::Word("-l".into()),
                Token::Gt,
                Token::Word("out.txt".into()),
            ]
        );
    }

    #[test]
    fn append_requires_two_adjacent_gt() {
        let shell = Shell::for_test();
        let tokens = tokenize("echo hi >> out.txt", &shell);
        assert!(tokens.contains(&Token::Append));
    }

    #[test]
    fn operators_inside_quotes_are_literal() {
        assert_eq!(words("echo '|' '>'"), vec!["echo", "|", ">"]);
    }

    #[test]
    fn unterminated_quote_closes_silently() {
        assert_eq!(words("echo 'unterminated"), vec!["echo", "unterminated"]);
    }

    #[test]
    fn undefined_var_expands_to_empty() {
        let shell = Shell::for_test();
        assert_eq!(words("echo $NOPE_XYZ_123"), vec!["echo", ""]);
    }

    #[test]
    fn dollar_with_no_valid_name_is_literal() {
        assert_eq!(words("echo $ $$"), vec!["echo", "$", "$$"]);
    }

    #[test]
    fn shell_var_shadows_process_env() {
        let mut shell = Shell::for_test();
        unsafe { std::env::set_var("MYSH_TEST_SHADOW", "env-value") };
        shell.set_var("MYSH_TEST_SHADOW", "shell-value");
        assert_eq!(words("echo $MYSH_TEST_SHADOW"), vec!["echo", "shell-value"]);
        unsafe { std::env::remove_var("MYSH_TEST_SHADOW") };
    }

    #[test]
    fn token_cap_truncates_silently() {
        let shell = Shell::for_test();
        let line: String = (0..MAX_TOKENS + 50).map(|i| format!("w{i} ")).collect();
        let tokens = tokenize(&line, &shell);
        assert_eq!(tokens.len(), MAX_TOKENS);
    }
}
