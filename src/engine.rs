//! Execution engine
//!
//! Runs a parsed [`TestSuite`]: prepares the run-scoped scratch root,
//! iterates test cases in declaration order (subject to the filter), creates
//! fresh per-test state and a scratch directory for each, and dispatches
//! commands. The first failing command stops its stanza; the run continues
//! with the next test case.
//!
//! The engine is explicit configuration — alias table, timeout, scratch
//! root — and holds no global state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::{FailureKind, RunError};
use crate::report::Reporter;
use crate::shell::ResolveContext;
use crate::state::RunState;
use crate::suite::{Command, CommandKind, Stanza, TestSuite};
use crate::{actions, assertions, shell};

/// Engine configuration, supplied at construction.
pub struct EngineConfig {
    /// Command alias table: short name → target path
    pub aliases: HashMap<String, String>,
    /// Base directory for relative alias targets. Defaults to the directory
    /// of the running executable.
    pub alias_base: Option<PathBuf>,
    /// Per-command timeout for process waits
    pub timeout: Duration,
    /// Run-scoped scratch root, destructively recreated at run start.
    /// Two runs against the same root must not overlap.
    pub scratch_root: PathBuf,
    /// Path of the spec file being run, for spec-relative executables
    pub spec_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aliases: HashMap::new(),
            alias_base: None,
            timeout: Duration::from_secs(5),
            scratch_root: PathBuf::from("shellspec-tmp"),
            spec_path: None,
        }
    }
}

/// Aggregate outcome of a run.
#[derive(Debug)]
pub struct RunSummary {
    /// All declared test cases
    pub total: usize,
    /// Test cases matched by the filter
    pub selected: usize,
    pub passed: usize,
    /// (1-based position, name) of each failed test case
    pub failed: Vec<(usize, String)>,
}

impl RunSummary {
    /// Overall success is "zero failures".
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The execution engine.
pub struct Engine {
    config: EngineConfig,
    reporter: Reporter,
    alias_base: PathBuf,
}

impl Engine {
    pub fn new(config: EngineConfig, reporter: Reporter) -> Self {
        let alias_base = config
            .alias_base
            .clone()
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config, reporter, alias_base }
    }

    /// Run every selected test case and report a summary.
    ///
    /// A purely numeric filter matches by 1-based position; anything else
    /// matches by case-insensitive substring of the test name.
    pub fn run_all(&self, suite: &TestSuite, filter: Option<&str>) -> Result<RunSummary, RunError> {
        let test_cases = suite.test_cases();
        let total = test_cases.len();
        self.reporter.header(total, suite.snippet_count());

        // Destructive recreation of the scratch root — concurrent runs
        // against the same root are unsupported
        if self.config.scratch_root.exists() {
            std::fs::remove_dir_all(&self.config.scratch_root)?;
        }
        std::fs::create_dir_all(&self.config.scratch_root)?;

        let mut passed = 0;
        let mut failed = Vec::new();
        let mut selected = 0;

        for (i, case) in test_cases.iter().enumerate() {
            let number = i + 1;
            if !selected_by_filter(filter, number, &case.name) {
                continue;
            }
            self.reporter.test_start(number, total, &case.name, selected == 0);
            selected += 1;

            if self.run_test_case(case, suite) {
                self.reporter.test_passed();
                passed += 1;
            } else {
                self.reporter.test_failed();
                failed.push((number, case.name.clone()));
            }
        }

        self.reporter.summary(passed, &failed, total);
        Ok(RunSummary { total, selected, passed, failed })
    }

    /// Run one test case in a fresh scratch directory with fresh state.
    pub fn run_test_case(&self, case: &Stanza, suite: &TestSuite) -> bool {
        let scratch = match self.create_test_dir(&case.name) {
            Ok(dir) => dir,
            Err(e) => {
                self.reporter.command_failed(case.line_number, &e.message);
                return false;
            }
        };
        // State (and with it the working context) is dropped when the case
        // finishes, whatever happened inside
        let mut state = RunState::new(scratch);
        self.run_stanza(case, suite, &mut state)
    }

    /// Execute a stanza's commands in order; the first failure stops it.
    fn run_stanza(&self, stanza: &Stanza, suite: &TestSuite, state: &mut RunState) -> bool {
        for command in &stanza.commands {
            if command.kind == CommandKind::Comment {
                self.reporter.comment(&command.comment);
                continue;
            }

            match self.run_command(command, suite, state) {
                Ok(true) => {}
                Ok(false) => {
                    if !command.comment.is_empty() {
                        self.reporter.context(&command.comment);
                    }
                    return false;
                }
                Err(e) => {
                    self.reporter.command_failed(command.line_number, &e.message);
                    if !command.comment.is_empty() {
                        self.reporter.context(&command.comment);
                    }
                    return false;
                }
            }
        }
        true
    }

    fn run_command(
        &self,
        cmd: &Command,
        suite: &TestSuite,
        state: &mut RunState,
    ) -> Result<bool, RunError> {
        match cmd.kind {
            CommandKind::Shell => self.run_shell(cmd, state),
            CommandKind::Assertion => assertions::run_assertion(cmd, state, &self.reporter),
            CommandKind::DslAction => self.run_dsl_action(cmd, suite, state),
            CommandKind::Comment => Ok(true),
        }
    }

    /// Execute a shell command — directly, or interactively when it carries
    /// expect/send interactions. Captured streams become visible to
    /// subsequent assertions and actions.
    fn run_shell(&self, cmd: &Command, state: &mut RunState) -> Result<bool, RunError> {
        let ctx = ResolveContext {
            aliases: &self.config.aliases,
            spec_dir: self.config.spec_path.as_deref().and_then(Path::parent),
            alias_base: &self.alias_base,
        };
        let program = shell::resolve_executable(&cmd.token, &ctx);

        let args: Vec<String> = cmd
            .args
            .iter()
            .map(|arg| resolve_arg(state, &self.reporter, arg))
            .collect();
        let args_display = args.join(" ");
        let env = state.env_overlay().to_vec();

        let result = if cmd.interactions.is_empty() {
            let result =
                shell::run_direct(&program, &args, &env, &state.cwd, self.config.timeout)?;
            self.reporter
                .shell_command(&cmd.token, &args_display, result.exit_code == 0);
            result
        } else {
            self.reporter.interactive_command(&cmd.token, &args_display);
            shell::run_interactive(
                &program,
                &args,
                &env,
                &state.cwd,
                &cmd.interactions,
                self.config.timeout,
                &self.reporter,
            )?
        };

        self.reporter.stderr_block(&result.stderr);
        self.reporter.output_block(&result.stdout);

        let actual_success = result.exit_code == 0;
        state.last_stdout = result.stdout;
        state.last_stderr = result.stderr;

        let expected_success = !cmd.negated;
        let description = if expected_success {
            "success (exit 0)"
        } else {
            "error (exit non-zero)"
        };
        Ok(self.reporter.check(description, expected_success == actual_success))
    }

    fn run_dsl_action(
        &self,
        cmd: &Command,
        suite: &TestSuite,
        state: &mut RunState,
    ) -> Result<bool, RunError> {
        match cmd.token.as_str() {
            "file" => actions::write_file(cmd, state),
            "stdout" => {
                let value = state.last_stdout.clone();
                actions::store_variable(cmd, state, &value)
            }
            "stderr" => {
                let value = state.last_stderr.clone();
                actions::store_variable(cmd, state, &value)
            }
            "env" => actions::set_env(cmd, state, &self.reporter),
            "@" => self.invoke_snippet(cmd, suite, state),
            other => Err(RunError::unknown(format!("unknown DSL action: {}", other))),
        }
    }

    /// Execute a snippet through the same stanza logic, sharing the invoking
    /// test case's state. A name already on the expansion stack is a cycle
    /// and fails fast instead of recursing until the stack limit.
    fn invoke_snippet(
        &self,
        cmd: &Command,
        suite: &TestSuite,
        state: &mut RunState,
    ) -> Result<bool, RunError> {
        let name = cmd
            .args
            .first()
            .ok_or_else(|| RunError::usage("@", "snippet-name"))?;
        let snippet = suite
            .snippet(name)
            .ok_or_else(|| RunError::unknown(format!("unknown snippet: {}", name)))?;

        if !state.enter_snippet(name) {
            return Err(RunError::new(
                FailureKind::SnippetCycle,
                format!("snippet cycle detected: {}", state.snippet_trace(name)),
            ));
        }
        let passed = self.run_stanza(snippet, suite, state);
        state.leave_snippet();
        Ok(passed)
    }

    /// Create a uniquely named scratch directory for one test case.
    fn create_test_dir(&self, test_name: &str) -> Result<PathBuf, RunError> {
        let sanitized = sanitize_test_name(test_name);
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(5)
            .map(char::from)
            .collect();
        let dir = self
            .config
            .scratch_root
            .join(format!("{}-{}", sanitized, suffix));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Resolve a literal or `@name` argument, surfacing a warning for
/// unresolved references (the literal text passes through as the value).
pub(crate) fn resolve_arg(state: &RunState, reporter: &Reporter, value: &str) -> String {
    let (resolved, unresolved) = state.resolve(value);
    if let Some(name) = unresolved {
        reporter.warn(&format!("undefined variable @{}", name));
    }
    resolved
}

/// Replace everything outside `[a-zA-Z0-9]` with `_` for directory names.
fn sanitize_test_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn selected_by_filter(filter: Option<&str>, number: usize, name: &str) -> bool {
    let Some(filter) = filter else { return true };
    if !filter.is_empty() && filter.chars().all(|c| c.is_ascii_digit()) {
        return filter.parse::<usize>().map_or(false, |n| n == number);
    }
    name.to_lowercase().contains(&filter.to_lowercase())
}
