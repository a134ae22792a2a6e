//! Assertion evaluation
//!
//! Assertions check the captured streams of the last shell command, files in
//! the scratch directory, or resolved values. Each returns `Ok(passed)`;
//! malformed or unknown assertions return an error, which the engine treats
//! as that command failing (never as a crash).

use similar::TextDiff;

use crate::engine::resolve_arg;
use crate::error::RunError;
use crate::report::Reporter;
use crate::state::RunState;
use crate::suite::Command;

/// Dispatch an assertion command by its target token.
pub fn run_assertion(
    cmd: &Command,
    state: &RunState,
    reporter: &Reporter,
) -> Result<bool, RunError> {
    match cmd.token.as_str() {
        "stdout" => assert_stream(cmd, &state.last_stdout, "stdout", reporter),
        "stderr" => assert_stream(cmd, &state.last_stderr, "stderr", reporter),
        "file" => assert_file(cmd, state, reporter),
        "==" | "!=" | "startswith" | "endswith" | "contains" => {
            assert_comparison(cmd, state, reporter)
        }
        other => Err(RunError::unknown(format!("unknown assertion target: {}", other))),
    }
}

/// stdout/stderr: exact match against attached content lines when present,
/// substring match against `args[0]` otherwise. Negation inverts either mode.
fn assert_stream(
    cmd: &Command,
    text: &str,
    target: &str,
    reporter: &Reporter,
) -> Result<bool, RunError> {
    if !cmd.content.is_empty() {
        let expected = cmd.content.join("\n");
        let matches = text == expected;

        let description = if cmd.negated {
            format!("{} differs", target)
        } else {
            format!("{} matches exactly", target)
        };
        let passed = if cmd.negated { !matches } else { matches };
        reporter.check(&description, passed);

        if reporter.verbose() {
            for line in &cmd.content {
                reporter.detail_block(line);
            }
        }
        if !passed && !cmd.negated {
            let diff = TextDiff::from_lines(expected.as_str(), text)
                .unified_diff()
                .header("expected", target)
                .to_string();
            reporter.detail_block(&diff);
        }
        return Ok(passed);
    }

    let needle = cmd
        .args
        .first()
        .ok_or_else(|| RunError::usage(cmd.token.as_str(), "substring"))?;
    let found = text.contains(needle.as_str());

    let description = if cmd.negated {
        format!("{} lacks '{}'", target, needle)
    } else {
        format!("{} has '{}'", target, needle)
    };
    let passed = if cmd.negated { !found } else { found };
    Ok(reporter.check(&description, passed))
}

/// `?.file path [substring]` with optional content lines.
///
/// Positive: the file must exist, contain the substring if given, and equal
/// the content exactly if given. Negative: a missing file alone passes;
/// otherwise the checks flip to "lacks" / "differs" on the existing content.
fn assert_file(cmd: &Command, state: &RunState, reporter: &Reporter) -> Result<bool, RunError> {
    let display = cmd
        .args
        .first()
        .ok_or_else(|| RunError::usage("file", "path [substring]"))?;
    let path = state.resolve_path(display);
    let substring = cmd.args.get(1);
    // An attached block of a single empty line means "no exact check",
    // matching the reference semantics
    let exact = {
        let joined = cmd.content.join("\n");
        (!joined.is_empty()).then_some(joined)
    };

    let exists = path.exists();
    let contents = if exists && (substring.is_some() || exact.is_some()) {
        std::fs::read_to_string(&path)?
    } else {
        String::new()
    };

    if !cmd.negated {
        let mut passed = reporter.check(&format!("file '{}' exists", display), exists);
        if exists {
            if let Some(needle) = substring {
                passed = passed
                    && reporter.check(
                        &format!("file '{}' has '{}'", display, needle),
                        contents.contains(needle.as_str()),
                    );
            }
            if let Some(ref expected) = exact {
                let matches = &contents == expected;
                passed =
                    passed && reporter.check(&format!("file '{}' contents match", display), matches);
                if !matches {
                    let diff = TextDiff::from_lines(expected.as_str(), contents.as_str())
                        .unified_diff()
                        .header("expected", display)
                        .to_string();
                    reporter.detail_block(&diff);
                }
            }
        }
        return Ok(passed);
    }

    if !exists {
        return Ok(reporter.check(&format!("file '{}' doesn't exist", display), true));
    }

    let mut passed = true;
    if let Some(needle) = substring {
        passed = reporter.check(
            &format!("file '{}' lacks '{}'", display, needle),
            !contents.contains(needle.as_str()),
        );
    }
    if let Some(ref expected) = exact {
        passed = passed
            && reporter.check(
                &format!("file '{}' contents don't match", display),
                &contents != expected,
            );
    }
    Ok(passed)
}

/// Binary comparison over two resolved values. `contains` means the
/// right-hand value is a substring of the left-hand value.
fn assert_comparison(
    cmd: &Command,
    state: &RunState,
    reporter: &Reporter,
) -> Result<bool, RunError> {
    if cmd.args.len() < 2 {
        return Err(RunError::usage(cmd.token.as_str(), "left right"));
    }

    let left_arg = &cmd.args[0];
    let right_arg = &cmd.args[1];
    let left = resolve_arg(state, reporter, left_arg);
    let right = resolve_arg(state, reporter, right_arg);

    // Show resolved variable values under the check in verbose mode
    let mut values = Vec::new();
    for (arg, resolved) in [(left_arg, &left), (right_arg, &right)] {
        if arg.starts_with('@') && arg != resolved {
            values.push((arg.clone(), resolved.clone()));
        }
    }

    let (result, op, negated_op) = match cmd.token.as_str() {
        "==" => (left == right, "==", "!="),
        "!=" => (left != right, "!=", "=="),
        "startswith" => (left.starts_with(&right), "startswith", "!startswith"),
        "endswith" => (left.ends_with(&right), "endswith", "!endswith"),
        "contains" => (left.contains(&right), "contains", "lacks"),
        other => return Err(RunError::unknown(format!("unknown assertion target: {}", other))),
    };

    let shown_op = if cmd.negated { negated_op } else { op };
    let description = format!("'{}' {} '{}'", left_arg, shown_op, right_arg);
    let passed = if cmd.negated { !result } else { result };

    if reporter.verbose() {
        Ok(reporter.check_with_values(&description, passed, &values))
    } else {
        Ok(reporter.check(&description, passed))
    }
}
