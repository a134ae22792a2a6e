//! Parsed spec data model
//!
//! A spec file parses into a [`TestSuite`]: an ordered list of test-case
//! [`Stanza`]s plus a name → snippet map. Stanzas hold ordered [`Command`]s;
//! the two-character line prefix fully determines a command's kind and
//! negation.

use std::collections::HashMap;

/// What a command does, determined by the first prefix character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `$` — run an executable (directly or through a pty session)
    Shell,
    /// `?` — check captured output, files, or values
    Assertion,
    /// `:` — mutate runtime state (files, variables, env) or invoke a snippet
    DslAction,
    /// `#` — in-stanza comment, reported and skipped
    Comment,
}

/// One step of a pty-driven interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    /// `$<` — block until the accumulated output matches a pattern
    Expect,
    /// `$>` — write a line to the process's input
    SendLine,
}

/// An (action, text) pair attached to a shell command.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub text: String,
}

/// One DSL instruction.
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    /// First token after the prefix — executable, assertion target, or action
    pub token: String,
    /// Remaining tokens
    pub args: Vec<String>,
    /// Literal lines attached via `..` continuation markers
    pub content: Vec<String>,
    /// Trailing comment, or the full text for `Comment` commands
    pub comment: String,
    /// True when the second prefix character was `!`
    pub negated: bool,
    /// 1-based line number in the spec file
    pub line_number: usize,
    /// Expect/send steps — only meaningful for `Shell` commands
    pub interactions: Vec<Interaction>,
}

impl Command {
    /// Reconstruct the command line, excluding comments and attachments.
    /// Args that contain whitespace or quote characters are re-quoted so the
    /// result parses back to an equivalent command.
    pub fn to_line(&self) -> String {
        if self.kind == CommandKind::Comment {
            return format!("# {}", self.comment);
        }

        let prefix = match (self.kind, self.negated) {
            (CommandKind::Shell, false) => "$.",
            (CommandKind::Shell, true) => "$!",
            (CommandKind::Assertion, false) => "?.",
            (CommandKind::Assertion, true) => "?!",
            (CommandKind::DslAction, _) => ":.",
            (CommandKind::Comment, _) => unreachable!(),
        };

        let mut line = format!("{}{}", prefix, quote_token(&self.token));
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote_token(arg));
        }
        line
    }
}

/// Quote a token if it would not survive re-tokenization bare.
fn quote_token(token: &str) -> String {
    let needs_quoting = token.is_empty()
        || token.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'');
    if !needs_quoting {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// A named ordered sequence of commands — a test case or a snippet.
#[derive(Debug, Clone)]
pub struct Stanza {
    pub name: String,
    pub commands: Vec<Command>,
    pub line_number: usize,
}

/// The parsed spec file — read-only during execution.
#[derive(Debug, Default)]
pub struct TestSuite {
    test_cases: Vec<Stanza>,
    snippets: HashMap<String, Stanza>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_test_case(&mut self, stanza: Stanza) {
        self.test_cases.push(stanza);
    }

    /// Register a snippet. Redefining a name silently overwrites the earlier
    /// definition — last write wins. Documented behavior, kept for spec-file
    /// compatibility.
    pub fn add_snippet(&mut self, stanza: Stanza) {
        self.snippets.insert(stanza.name.clone(), stanza);
    }

    /// Test cases in declaration order.
    pub fn test_cases(&self) -> &[Stanza] {
        &self.test_cases
    }

    pub fn snippet(&self, name: &str) -> Option<&Stanza> {
        self.snippets.get(name)
    }

    pub fn snippet_count(&self) -> usize {
        self.snippets.len()
    }
}
