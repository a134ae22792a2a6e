//! DSL actions
//!
//! Actions mutate per-test runtime state: write files, capture streams into
//! variables, extend the environment overlay. Snippet invocation (`:.@`)
//! lives in the engine because it recurses into stanza execution.

use crate::engine::resolve_arg;
use crate::error::RunError;
use crate::report::Reporter;
use crate::state::RunState;
use crate::suite::Command;

/// `:.file <path> [octal-mode]` — write the attached content to `path`,
/// creating parent directories, then apply the permission mode (default 0644).
pub fn write_file(cmd: &Command, state: &RunState) -> Result<bool, RunError> {
    let display = cmd
        .args
        .first()
        .ok_or_else(|| RunError::usage("file", "path [mode]"))?;
    let mode = match cmd.args.get(1) {
        Some(arg) => u32::from_str_radix(arg, 8)
            .map_err(|_| RunError::usage("file", "path [octal-mode]"))?,
        None => 0o644,
    };

    let path = state.resolve_path(display);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, cmd.content.join("\n"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(true)
}

/// `:.stdout @name` / `:.stderr @name` — store the captured stream's text,
/// trimmed, under `name`. The destination must carry the `@` sigil.
pub fn store_variable(cmd: &Command, state: &mut RunState, value: &str) -> Result<bool, RunError> {
    let destination = cmd
        .args
        .first()
        .ok_or_else(|| RunError::usage(cmd.token.as_str(), "@name"))?;

    let name = destination.strip_prefix('@').ok_or_else(|| {
        RunError::usage(cmd.token.as_str(), "@name (variable name must start with '@')")
    })?;
    if name.is_empty() {
        return Err(RunError::usage(
            cmd.token.as_str(),
            "@name (variable name cannot be empty after '@')",
        ));
    }

    state.set_var(name, value.trim());
    Ok(true)
}

/// `:.env <name> <value>` — resolve `value` and add it to the environment
/// overlay for subsequent shell commands in this test case.
pub fn set_env(cmd: &Command, state: &mut RunState, reporter: &Reporter) -> Result<bool, RunError> {
    if cmd.args.len() < 2 {
        return Err(RunError::usage("env", "name value"));
    }

    let name = cmd.args[0].clone();
    let value = resolve_arg(state, reporter, &cmd.args[1]);
    reporter.verbose_note(&format!("set env {}='{}'", name, value));
    state.set_env(name, value);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::CommandKind;

    fn action(token: &str, args: &[&str], content: &[&str]) -> Command {
        Command {
            kind: CommandKind::DslAction,
            token: token.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            content: content.iter().map(|s| s.to_string()).collect(),
            comment: String::new(),
            negated: false,
            line_number: 1,
            interactions: Vec::new(),
        }
    }

    #[test]
    fn test_write_file_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let state = RunState::new(dir.path().to_path_buf());

        let cmd = action("file", &["sub/dir/out.txt"], &["hello", "world"]);
        assert!(write_file(&cmd, &state).unwrap());
        let written = std::fs::read_to_string(dir.path().join("sub/dir/out.txt")).unwrap();
        assert_eq!(written, "hello\nworld");
    }

    #[test]
    fn test_write_file_empty_without_content() {
        let dir = tempfile::tempdir().unwrap();
        let state = RunState::new(dir.path().to_path_buf());

        assert!(write_file(&action("file", &["empty.txt"], &[]), &state).unwrap());
        assert_eq!(std::fs::read_to_string(dir.path().join("empty.txt")).unwrap(), "");
    }

    #[test]
    #[cfg(unix)]
    fn test_write_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let state = RunState::new(dir.path().to_path_buf());

        write_file(&action("file", &["script.sh", "755"], &["#!/bin/sh"]), &state).unwrap();
        let mode = std::fs::metadata(dir.path().join("script.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_write_file_bad_mode() {
        let dir = tempfile::tempdir().unwrap();
        let state = RunState::new(dir.path().to_path_buf());
        let err = write_file(&action("file", &["x", "99z"], &[]), &state).unwrap_err();
        assert!(err.message.contains("usage"));
    }

    #[test]
    fn test_store_variable_trims() {
        let mut state = RunState::new(std::path::PathBuf::from("."));
        let cmd = action("stdout", &["@out"], &[]);
        assert!(store_variable(&cmd, &mut state, "  hello\n").unwrap());
        assert_eq!(state.var("out"), Some("hello"));
    }

    #[test]
    fn test_store_variable_requires_sigil() {
        let mut state = RunState::new(std::path::PathBuf::from("."));
        assert!(store_variable(&action("stdout", &["out"], &[]), &mut state, "x").is_err());
        assert!(store_variable(&action("stdout", &["@"], &[]), &mut state, "x").is_err());
    }

    #[test]
    fn test_set_env_resolves_variables() {
        let mut state = RunState::new(std::path::PathBuf::from("."));
        state.set_var("token", "secret");
        let reporter = Reporter::new(false);

        set_env(&action("env", &["AUTH", "@token"], &[]), &mut state, &reporter).unwrap();
        assert_eq!(
            state.env_overlay(),
            &[("AUTH".to_string(), "secret".to_string())]
        );
    }
}
