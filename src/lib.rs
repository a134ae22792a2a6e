//! shellspec: a spec-driven E2E test runner for CLI programs
//!
//! Parses a line-oriented spec file describing shell invocations,
//! pty-driven interactive sessions and assertions, runs each test case
//! against the real operating system, and reports pass/fail.
//!
//! # Spec Syntax
//!
//! ```text
//! >Test case name                 -- starts a test case
//! >@Snippet name                  -- starts a reusable snippet
//! #comment                        -- comment line
//! $.token args... [# comment]     -- shell command, expect success
//! $!token args... [# comment]     -- shell command, expect failure
//! $< pattern                      -- (after $ command) expect pattern on the pty
//! $> text                         -- (after $ command) send line to the pty
//! ?.target args...                -- assertion, expect true
//! ?!target args...                -- assertion, expect false
//! :.action args...                -- DSL action
//! .. literal content line         -- attached literal content (verbatim)
//! ```
//!
//! # Assertions
//!
//! | Target | Description |
//! |--------|-------------|
//! | `stdout` / `stderr` | Substring match, or exact match against `..` content |
//! | `file` | Existence, substring, and exact-content checks |
//! | `==` `!=` `startswith` `endswith` `contains` | Binary comparisons over literals and `@vars` |
//!
//! # Actions
//!
//! | Action | Description |
//! |--------|-------------|
//! | `file <path> [mode]` | Write `..` content to a file |
//! | `stdout @name` / `stderr @name` | Capture a stream into a variable |
//! | `env <name> <value>` | Set an env var for later shell commands |
//! | `@ <snippet>` | Invoke a snippet, sharing the test's state |
//!
//! Each test case runs in its own scratch directory with fresh variable and
//! environment stores; nothing leaks between test cases.

mod actions;
mod assertions;
mod engine;
mod error;
mod parser;
mod report;
mod session;
mod shell;
mod state;
mod suite;
mod tokenizer;

pub use engine::{Engine, EngineConfig, RunSummary};
pub use error::{FailureKind, RunError};
pub use parser::{parse_spec, ParseError};
pub use report::Reporter;
pub use session::{InteractiveSession, PtySession};
pub use shell::{ExecutionKind, ExecutionResult, INTERACTIVE_FAULT_EXIT};
pub use state::RunState;
pub use suite::{Command, CommandKind, Interaction, InteractionKind, Stanza, TestSuite};
pub use tokenizer::tokenize;
