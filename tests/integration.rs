//! Integration tests: parse spec text and run it against real processes.
//!
//! Each test gets its own scratch root inside a tempdir, so suites can run
//! in parallel under `cargo test`.

use shellspec::{parse_spec, Engine, EngineConfig, Reporter, RunSummary};
use tempfile::TempDir;

fn run_spec(spec: &str, filter: Option<&str>) -> (RunSummary, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let suite = parse_spec(spec).unwrap();
    let config = EngineConfig {
        scratch_root: dir.path().join("runs"),
        ..Default::default()
    };
    let engine = Engine::new(config, Reporter::new(false));
    let summary = engine.run_all(&suite, filter).unwrap();
    (summary, dir)
}

#[test]
fn file_action_and_assertions_round_trip() {
    let spec = "\
>file round trip
:.file out.txt
.. hello
.. world
?.file out.txt hello
?.file out.txt
.. hello
.. world
?!file missing.txt
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
    assert_eq!(summary.passed, 1);
}

#[test]
fn stdout_capture_substring_and_exact() {
    let spec = "\
>echo output
$.echo hello
?.stdout hello
?.stdout
.. hello
..
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
fn stderr_is_captured_separately() {
    let spec = "\
>stderr capture
$.sh -c \"echo out; echo oops >&2\"
?.stdout out
?.stderr oops
?!stdout oops
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
fn negated_shell_command_expects_failure() {
    let spec = "\
>expected failure passes
$!sh -c \"exit 1\"

>unexpected failure fails
$.sh -c \"exit 1\"
?.stdout never-reached
";
    let (summary, _dir) = run_spec(spec, None);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0], (2, "unexpected failure fails".to_string()));
}

#[test]
fn failing_command_stops_the_stanza() {
    // The file action after the failed assertion must not run
    let spec = "\
>stops at first failure
$.echo hi
?.stdout absent-text
:.file should-not-exist.txt
.. data
";
    let (summary, dir) = run_spec(spec, None);
    assert_eq!(summary.failed.len(), 1);

    let runs = dir.path().join("runs");
    let test_dir = std::fs::read_dir(&runs).unwrap().next().unwrap().unwrap().path();
    assert!(!test_dir.join("should-not-exist.txt").exists());
}

#[test]
fn variables_and_comparisons() {
    let spec = "\
>variables
$.echo hello
:.stdout @v
?.== @v hello
?.contains @v lo
?.startswith @v he
?.endswith @v lo
?!== a b
?!contains @v xyz
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
fn env_action_reaches_subsequent_commands() {
    let spec = "\
>env overlay
:.env GREETING hi
$.sh -c \"printf %s \\\"$GREETING\\\"\"
?.stdout hi
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
fn snippet_shares_state_but_not_across_tests() {
    let spec = "\
>@capture
:.stdout @x

>first
$.echo one
:.@ capture
?.== @x one

>second
$.echo two
:.@ capture
?.== @x two
";
    let (summary, dir) = run_spec(spec, None);
    assert!(summary.all_passed());
    assert_eq!(summary.passed, 2);

    // Each test case got its own scratch directory
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("runs")).unwrap().collect();
    assert_eq!(entries.len(), 2);
}

#[test]
fn state_is_fresh_per_test_case() {
    let spec = "\
>sets a variable
$.echo one
:.stdout @x
?.== @x one

>starts clean
?!== @x one
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
fn numeric_filter_selects_by_position() {
    let spec = "\
>first
$.echo a

>second
$.sh -c \"exit 1\"
";
    let (summary, _dir) = run_spec(spec, Some("1"));
    assert_eq!(summary.selected, 1);
    assert_eq!(summary.passed, 1);
    assert!(summary.all_passed());
}

#[test]
fn substring_filter_is_case_insensitive() {
    let spec = "\
>Calculator basics
$.echo a

>greeter
$.echo b
";
    let (summary, _dir) = run_spec(spec, Some("CALC"));
    assert_eq!(summary.selected, 1);
    assert_eq!(summary.passed, 1);
}

#[test]
fn snippet_cycle_fails_the_test_not_the_run() {
    let spec = "\
>@loop
:.@ loop

>cycles
:.@ loop

>still runs
$.echo fine
";
    let (summary, _dir) = run_spec(spec, None);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed[0].1, "cycles");
}

#[test]
fn unknown_constructs_fail_without_crashing() {
    let spec = "\
>unknown assertion
$.echo hi
?.bogus hi

>unknown action
:.frobnicate x

>unknown snippet
:.@ nonexistent

>survivor
$.echo ok
?.stdout ok
";
    let (summary, _dir) = run_spec(spec, None);
    assert_eq!(summary.failed.len(), 3);
    assert_eq!(summary.passed, 1);
}

#[test]
fn missing_executable_is_a_command_failure() {
    let spec = "\
>missing tool
$.no-such-tool-really --help
";
    let (summary, _dir) = run_spec(spec, None);
    assert_eq!(summary.failed.len(), 1);
}

#[test]
fn unresolved_variable_passes_through_literally() {
    let spec = "\
>literal passthrough
$.echo @missing
?.stdout @missing
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
fn comments_are_reported_and_skipped() {
    let spec = "\
# top-level header

>with comments
# explains the next step
$.echo hi # trailing note
?.stdout hi
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
#[cfg(unix)]
fn interactive_session_end_to_end() {
    let spec = "\
>interactive greeter
:.file greeter.sh 755
.. echo What is your name
.. read name
.. echo Hello, $name
$.sh greeter.sh
$< What is your name
$> alice
$< Hello, alice
?.stdout alice
";
    let (summary, _dir) = run_spec(spec, None);
    assert!(summary.all_passed());
}

#[test]
#[cfg(unix)]
fn interactive_pattern_mismatch_fails_the_command() {
    let spec = "\
>wrong prompt
$.sh -c \"echo actual prompt\"
$< pattern that never appears
";
    let (summary, _dir) = run_spec(spec, None);
    assert_eq!(summary.failed.len(), 1);
}

#[test]
fn scratch_root_is_recreated_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("runs");
    std::fs::create_dir_all(root.join("stale-dir")).unwrap();

    let suite = parse_spec(">t\n$.echo hi\n").unwrap();
    let config = EngineConfig { scratch_root: root.clone(), ..Default::default() };
    let engine = Engine::new(config, Reporter::new(false));
    engine.run_all(&suite, None).unwrap();

    assert!(!root.join("stale-dir").exists());
    // One fresh scratch dir for the one test, left in place for inspection
    let entries: Vec<_> = std::fs::read_dir(&root).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn parse_error_aborts_before_any_test() {
    let err = parse_spec(">t\n$.echo ok\nnot a command\n").unwrap_err();
    assert_eq!(err.line, 3);
}
