//! Runtime failure taxonomy
//!
//! Parse errors live in the parser (they abort the whole run before any test
//! executes). Everything here is a per-command failure: the stanza stops, the
//! test case is marked failed, and the run continues with the next test case.

use std::fmt;

/// The kind of runtime failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Executable missing or failed to spawn
    Exec,
    /// Command exceeded the per-command timeout
    Timeout,
    /// Interactive-protocol fault (pattern never matched, pty error)
    Session,
    /// Unknown assertion target, DSL action, or snippet name
    UnknownConstruct,
    /// Snippet invokes itself, directly or transitively
    SnippetCycle,
    /// Command used with the wrong arguments
    Usage,
    /// Filesystem or other IO fault
    Io,
}

/// A runtime failure scoped to a single command
#[derive(Debug)]
pub struct RunError {
    pub kind: FailureKind,
    pub message: String,
}

impl RunError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn exec(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Exec, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, msg)
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::Session, msg)
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::new(FailureKind::UnknownConstruct, msg)
    }

    pub fn usage(what: &str, expected: &str) -> Self {
        Self::new(FailureKind::Usage, format!("usage: {} {}", what, expected))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RunError {}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        Self::new(FailureKind::Io, e.to_string())
    }
}
