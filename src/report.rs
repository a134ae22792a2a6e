//! Console reporter
//!
//! The single output surface of the runner. Holds the verbose flag as an
//! explicit value — there is no global state. Rendering is deliberately
//! simple: one line per event, a `│ ` left border for captured output blocks,
//! no wrapping or terminal-width detection.

use colored::Colorize;

/// Renders per-command, per-test, and summary output.
pub struct Reporter {
    verbose: bool,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Run header: suite size before any test executes.
    pub fn header(&self, tests: usize, snippets: usize) {
        println!("{}", "ShellSpec Test Runner".blue().bold());
        println!("Found {} test cases and {} snippets", tests, snippets);
        println!();
    }

    /// Banner for one test case. A rule separates tests after the first.
    pub fn test_start(&self, number: usize, total: usize, name: &str, first: bool) {
        if !first {
            println!();
            println!("{}", "────────────────────────────────────────".dimmed());
        }
        println!("{}", format!("[{}/{}] {}", number, total, name).yellow().bold());
    }

    pub fn test_passed(&self) {
        println!("\n{}", "PASS".green().bold());
    }

    pub fn test_failed(&self) {
        println!("\n{}", "FAIL".red().bold());
    }

    /// In-stanza comment line.
    pub fn comment(&self, text: &str) {
        println!("\n◼ {}", text);
    }

    /// Echo a direct shell command, colored by its exit status.
    pub fn shell_command(&self, token: &str, args: &str, ok: bool) {
        let line = join_command(token, args);
        if ok {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }
    }

    /// Echo an interactive shell command as it starts.
    pub fn interactive_command(&self, token: &str, args: &str) {
        println!("{}", join_command(token, args).blue());
    }

    /// One expect/send/exit step of an interactive session.
    pub fn interaction(&self, label: &str, text: &str) {
        println!("{}", format!("│ {}: {}", label, text).dimmed());
    }

    /// Print an assertion description with its pass/fail glyph.
    /// Returns the condition unchanged so call sites can stay one-liners.
    pub fn check(&self, description: &str, ok: bool) -> bool {
        if ok {
            println!("{}", format!("▸ {} ✓", description).green());
        } else {
            println!("{}", format!("▸ {} ✗", description).red());
        }
        ok
    }

    /// Like [`check`](Self::check), also showing resolved variable values.
    pub fn check_with_values(&self, description: &str, ok: bool, values: &[(String, String)]) -> bool {
        let result = self.check(description, ok);
        for (name, value) in values {
            println!("{}", format!("│ {}: \"{}\"", name, value).dimmed());
        }
        result
    }

    /// Captured stdout block (verbose mode only).
    pub fn output_block(&self, text: &str) {
        if !self.verbose || text.trim().is_empty() {
            return;
        }
        for line in text.trim_end().lines() {
            println!("{}", format!("│ {}", line).dimmed());
        }
    }

    /// Captured stderr block (verbose mode only), bordered in yellow.
    pub fn stderr_block(&self, text: &str) {
        if !self.verbose || text.trim().is_empty() {
            return;
        }
        for line in text.trim_end().lines() {
            println!("{} {}", "│".yellow(), line.dimmed());
        }
    }

    /// Diff or expected-content block shown when an exact match fails.
    pub fn detail_block(&self, text: &str) {
        for line in text.trim_end().lines() {
            println!("{}", format!("│ {}", line).dimmed());
        }
    }

    pub fn warn(&self, message: &str) {
        println!("{}", format!("Warning: {}", message).yellow());
    }

    /// A command-level failure with its line number.
    pub fn command_failed(&self, line_number: usize, message: &str) {
        println!("{}", format!("Command failed at line {}: {}", line_number, message).red());
    }

    /// Trailing-comment context shown under a failed command.
    pub fn context(&self, comment: &str) {
        println!("  Context: {}", comment);
    }

    pub fn verbose_note(&self, message: &str) {
        if self.verbose {
            println!("{}", format!("▸ {} ✓", message).green());
        }
    }

    /// Final tally with the list of failed test names.
    pub fn summary(&self, passed: usize, failed: &[(usize, String)], total: usize) {
        println!();
        println!("{}", "────────────────────────────────────────".dimmed());
        println!("{}", "Test Results".bold());
        println!(
            "  {}, {} out of {} tests",
            format!("{} passed", passed).green(),
            format!("{} failed", failed.len()).red(),
            total,
        );

        if !failed.is_empty() {
            println!("\n{}", "Failed tests:".bold());
            for (number, name) in failed {
                println!("  {}", format!("• [{}] {}", number, name).red());
            }
        }

        println!();
        if failed.is_empty() {
            println!("{}", "All tests passed".green().bold());
        } else {
            println!("{}", "Some tests failed".red().bold());
        }
    }
}

fn join_command(token: &str, args: &str) -> String {
    if args.is_empty() {
        token.to_string()
    } else {
        format!("{} {}", token, args)
    }
}
