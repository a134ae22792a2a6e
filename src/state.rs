//! Per-test-case runtime state
//!
//! Created fresh at the start of every test case and discarded after it
//! finishes — nothing leaks between test cases. Snippets share the invoking
//! test case's state, not an isolated one.

use std::path::{Path, PathBuf};

/// Mutable state owned by the engine for one test case.
pub struct RunState {
    /// Scratch working directory for this test case. Subprocesses run here
    /// and relative paths in assertions/actions resolve against it.
    pub cwd: PathBuf,
    /// Variable store — names never include the `@` sigil
    variables: Vec<(String, String)>,
    /// Environment overlay, merged over the inherited process environment
    /// for subsequent shell commands. Ordered for deterministic subprocess env.
    env_overlay: Vec<(String, String)>,
    /// Captured stdout of the last shell command
    pub last_stdout: String,
    /// Captured stderr of the last shell command (empty for interactive runs)
    pub last_stderr: String,
    /// Snippet names currently being expanded, for cycle detection
    snippet_stack: Vec<String>,
}

impl RunState {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            variables: Vec::new(),
            env_overlay: Vec::new(),
            last_stdout: String::new(),
            last_stderr: String::new(),
            snippet_stack: Vec::new(),
        }
    }

    /// Store a variable under `name` (without the sigil), overwriting any
    /// earlier value.
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.variables.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value;
        } else {
            self.variables.push((name, value));
        }
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Resolve a value that is either a literal or an `@name` reference.
    /// An unresolved reference returns the literal `@name` text together with
    /// the name that failed, so the caller can surface a warning.
    pub fn resolve(&self, value: &str) -> (String, Option<String>) {
        if let Some(name) = value.strip_prefix('@') {
            match self.var(name) {
                Some(resolved) => (resolved.to_string(), None),
                None => (value.to_string(), Some(name.to_string())),
            }
        } else {
            (value.to_string(), None)
        }
    }

    /// Set an environment overlay entry for subsequent shell commands.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.env_overlay.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.env_overlay.push((key, value));
        }
    }

    pub fn env_overlay(&self) -> &[(String, String)] {
        &self.env_overlay
    }

    /// Resolve a path against the scratch working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }

    /// Push a snippet onto the expansion stack. Returns `false` when the
    /// name is already being expanded (a cycle).
    pub fn enter_snippet(&mut self, name: &str) -> bool {
        if self.snippet_stack.iter().any(|n| n == name) {
            return false;
        }
        self.snippet_stack.push(name.to_string());
        true
    }

    pub fn leave_snippet(&mut self) {
        self.snippet_stack.pop();
    }

    /// The expansion stack joined for diagnostics, e.g. `a -> b -> a`.
    pub fn snippet_trace(&self, repeated: &str) -> String {
        let mut names: Vec<&str> = self.snippet_stack.iter().map(String::as_str).collect();
        names.push(repeated);
        names.join(" -> ")
    }
}
