//! Spec file parser
//!
//! Parses the line-oriented spec grammar into a [`TestSuite`]:
//! - `>Name` starts a test case, `>@Name` starts a snippet
//! - `#` lines are comments (skipped at top level, recorded inside stanzas)
//! - `$`, `?`, `:` prefix shell commands, assertions, and DSL actions;
//!   a second character of `!` negates the command
//! - `$<pattern` / `$>text` attach expect/send interactions to the preceding
//!   shell command
//! - `.. text` lines attach literal content to the preceding command
//!
//! Parsing is eager and linear; once a construct's lookahead condition fails,
//! control returns to the enclosing loop. Reaching end of input mid-stanza is
//! not an error. Any malformed line is a fatal parse error carrying a 1-based
//! line number.

use crate::suite::{Command, CommandKind, Interaction, InteractionKind, Stanza, TestSuite};
use crate::tokenizer::tokenize;

/// Fatal parse error — no test executes when one is returned.
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse full spec-file text into a test suite.
pub fn parse_spec(content: &str) -> Result<TestSuite, ParseError> {
    Parser::new(content).parse()
}

/// Line reader with explicit end-of-input handling.
struct Reader {
    lines: Vec<String>,
    position: usize,
}

impl Reader {
    fn new(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
            position: 0,
        }
    }

    /// Next line without consuming it, `None` at end of input.
    fn peek(&self) -> Option<&str> {
        self.lines.get(self.position).map(String::as_str)
    }

    /// Consume and return the next line, `None` at end of input.
    fn consume(&mut self) -> Option<&str> {
        let line = self.lines.get(self.position)?;
        self.position += 1;
        Some(line)
    }

    /// 1-based number of the line `peek()` would return.
    fn line_number(&self) -> usize {
        self.position + 1
    }
}

struct Parser {
    reader: Reader,
    suite: TestSuite,
}

impl Parser {
    fn new(content: &str) -> Self {
        Self {
            reader: Reader::new(content),
            suite: TestSuite::new(),
        }
    }

    fn parse(mut self) -> Result<TestSuite, ParseError> {
        while let Some(line) = self.reader.peek() {
            if line.trim().is_empty() || line.starts_with('#') {
                self.reader.consume();
                continue;
            }
            if line.starts_with('>') {
                self.parse_stanza()?;
                continue;
            }
            return Err(ParseError {
                message: format!("unknown line: {}", line),
                line: self.reader.line_number(),
            });
        }
        Ok(self.suite)
    }

    /// Parse from a `>` or `>@` header to the next header or end of input.
    fn parse_stanza(&mut self) -> Result<(), ParseError> {
        let line_number = self.reader.line_number();
        let header = self.reader.consume().expect("caller peeked a header line").to_string();

        if let Some(name) = header.strip_prefix(">@") {
            let name = name.trim().to_string();
            let commands = self.parse_commands()?;
            self.suite.add_snippet(Stanza { name, commands, line_number });
        } else {
            let name = header[1..].trim().to_string();
            let commands = self.parse_commands()?;
            self.suite.add_test_case(Stanza { name, commands, line_number });
        }
        Ok(())
    }

    /// Collect commands until the next `>` header or end of input.
    fn parse_commands(&mut self) -> Result<Vec<Command>, ParseError> {
        let mut commands = Vec::new();

        while let Some(line) = self.reader.peek() {
            if line.trim().is_empty() {
                self.reader.consume();
                continue;
            }
            if line.starts_with('>') {
                break;
            }
            match line.chars().next() {
                Some('$') | Some('?') | Some(':') | Some('#') => {
                    commands.push(self.parse_command()?);
                }
                _ => {
                    return Err(ParseError {
                        message: format!("unknown command: {}", line),
                        line: self.reader.line_number(),
                    });
                }
            }
        }

        Ok(commands)
    }

    /// Parse one command line plus trailing interaction and content lines.
    fn parse_command(&mut self) -> Result<Command, ParseError> {
        let line_number = self.reader.line_number();
        let mut line = self.reader.consume().expect("caller peeked a command line").to_string();

        // Full-line comment: the remainder is stored verbatim, no further parsing
        if let Some(rest) = line.strip_prefix('#') {
            return Ok(Command {
                kind: CommandKind::Comment,
                token: String::new(),
                args: Vec::new(),
                content: Vec::new(),
                comment: rest.trim().to_string(),
                negated: false,
                line_number,
                interactions: Vec::new(),
            });
        }

        // Split off a trailing comment at the first ` # `
        let mut comment = String::new();
        if let Some(pos) = line.find(" # ") {
            comment = line[pos + 3..].trim().to_string();
            line.truncate(pos);
        }

        let mut chars = line.char_indices();
        let first = chars.next().map(|(_, c)| c);
        let second = chars.next();
        let (second_char, rest_start) = match second {
            Some((i, c)) => (c, i + c.len_utf8()),
            None => {
                return Err(ParseError {
                    message: format!("invalid command: {}", line),
                    line: line_number,
                });
            }
        };

        let kind = match first {
            Some('$') => CommandKind::Shell,
            Some('?') => CommandKind::Assertion,
            Some(':') => CommandKind::DslAction,
            _ => {
                return Err(ParseError {
                    message: format!("unknown command prefix: {}", &line[..rest_start]),
                    line: line_number,
                });
            }
        };
        let negated = second_char == '!';

        let mut tokens = tokenize(line[rest_start..].trim());
        if tokens.is_empty() {
            return Err(ParseError {
                message: "empty command".to_string(),
                line: line_number,
            });
        }
        let token = tokens.remove(0);
        let args = tokens;

        // Interaction lines may only trail a shell command, before any content
        let mut interactions = Vec::new();
        if kind == CommandKind::Shell {
            while let Some(next) = self.reader.peek() {
                let interaction_kind = if next.starts_with("$<") {
                    InteractionKind::Expect
                } else if next.starts_with("$>") {
                    InteractionKind::SendLine
                } else {
                    break;
                };
                let text = marker_text(self.reader.consume().expect("peeked"));
                if !text.is_empty() {
                    interactions.push(Interaction { kind: interaction_kind, text });
                }
            }
        }

        // Content lines: everything after the 3-character `.. ` marker, verbatim
        let mut content = Vec::new();
        while let Some(next) = self.reader.peek() {
            if !next.starts_with("..") {
                break;
            }
            content.push(marker_text(self.reader.consume().expect("peeked")));
        }

        Ok(Command {
            kind,
            token,
            args,
            content,
            comment,
            negated,
            line_number,
            interactions,
        })
    }
}

/// Text after a 3-character continuation marker (`$< `, `$> `, `.. `).
/// Shorter lines contribute empty text.
fn marker_text(line: &str) -> String {
    line.chars().skip(3).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::CommandKind;

    #[test]
    fn test_parse_empty_spec() {
        let suite = parse_spec("").unwrap();
        assert!(suite.test_cases().is_empty());
        assert_eq!(suite.snippet_count(), 0);
    }

    #[test]
    fn test_parse_test_case_and_snippet() {
        let suite = parse_spec(
            ">First test\n\
             $.echo hello\n\
             \n\
             >@setup\n\
             :.env KEY value\n",
        )
        .unwrap();
        assert_eq!(suite.test_cases().len(), 1);
        assert_eq!(suite.test_cases()[0].name, "First test");
        assert_eq!(suite.snippet_count(), 1);
        assert_eq!(suite.snippet("setup").unwrap().commands.len(), 1);
    }

    #[test]
    fn test_parse_command_fields() {
        let suite = parse_spec(">t\n$!grep -q pattern file.txt # should fail\n").unwrap();
        let cmd = &suite.test_cases()[0].commands[0];
        assert_eq!(cmd.kind, CommandKind::Shell);
        assert!(cmd.negated);
        assert_eq!(cmd.token, "grep");
        assert_eq!(cmd.args, vec!["-q", "pattern", "file.txt"]);
        assert_eq!(cmd.comment, "should fail");
        assert_eq!(cmd.line_number, 2);
    }

    #[test]
    fn test_parse_quoted_args() {
        let suite = parse_spec(">t\n?.stdout \"two words\"\n").unwrap();
        let cmd = &suite.test_cases()[0].commands[0];
        assert_eq!(cmd.args, vec!["two words"]);
    }

    #[test]
    fn test_parse_interactions_in_order() {
        let suite = parse_spec(
            ">t\n\
             $.greeter\n\
             $< Enter your name:\n\
             $> alice\n\
             $< Hello, alice\n\
             .. trailing content\n",
        )
        .unwrap();
        let cmd = &suite.test_cases()[0].commands[0];
        assert_eq!(cmd.interactions.len(), 3);
        assert_eq!(cmd.interactions[0].kind, InteractionKind::Expect);
        assert_eq!(cmd.interactions[0].text, "Enter your name:");
        assert_eq!(cmd.interactions[1].kind, InteractionKind::SendLine);
        assert_eq!(cmd.interactions[1].text, "alice");
        assert_eq!(cmd.interactions[2].text, "Hello, alice");
        assert_eq!(cmd.content, vec!["trailing content"]);
    }

    #[test]
    fn test_parse_content_preserves_text() {
        let suite = parse_spec(">t\n:.file out.txt\n..  indented\n..\n.. last\n").unwrap();
        let cmd = &suite.test_cases()[0].commands[0];
        assert_eq!(cmd.content, vec![" indented", "", "last"]);
    }

    #[test]
    fn test_parse_in_stanza_comment() {
        let suite = parse_spec(">t\n# checks the basics\n$.true\n").unwrap();
        let cmd = &suite.test_cases()[0].commands[0];
        assert_eq!(cmd.kind, CommandKind::Comment);
        assert_eq!(cmd.comment, "checks the basics");
    }

    #[test]
    fn test_parse_top_level_comment_skipped() {
        let suite = parse_spec("# header\n\n>t\n$.true\n").unwrap();
        assert_eq!(suite.test_cases()[0].commands.len(), 1);
    }

    #[test]
    fn test_parse_unknown_top_level_line() {
        let err = parse_spec("garbage\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unknown line"));
    }

    #[test]
    fn test_parse_unknown_command_in_stanza() {
        let err = parse_spec(">t\nnot a command\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unknown command"));
    }

    #[test]
    fn test_parse_truncated_prefix() {
        let err = parse_spec(">t\n$\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("invalid command"));
    }

    #[test]
    fn test_parse_empty_command() {
        let err = parse_spec(">t\n$.\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("empty command"));
    }

    #[test]
    fn test_parse_eof_mid_stanza_ok() {
        let suite = parse_spec(">t\n$.true").unwrap();
        assert_eq!(suite.test_cases()[0].commands.len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let text = ">t\n$!run --flag \"two words\"\n?.== @x literal\n";
        let suite = parse_spec(text).unwrap();
        for cmd in &suite.test_cases()[0].commands {
            let line = cmd.to_line();
            let reparsed = parse_spec(&format!(">t\n{}\n", line)).unwrap();
            let back = &reparsed.test_cases()[0].commands[0];
            assert_eq!(back.kind, cmd.kind);
            assert_eq!(back.negated, cmd.negated);
            assert_eq!(back.token, cmd.token);
            assert_eq!(back.args, cmd.args);
        }
    }

    #[test]
    fn test_snippet_redefinition_overwrites() {
        let suite = parse_spec(">@s\n$.true\n>@s\n$.false\n$.false\n").unwrap();
        assert_eq!(suite.snippet("s").unwrap().commands.len(), 2);
    }
}
