//! Shell command execution
//!
//! Resolves executable names (alias table, spec-relative paths, system
//! lookup) and runs them either directly — separate stdout/stderr capture
//! with a polling timeout — or interactively through a pty session replaying
//! expect/send steps. Both modes produce an [`ExecutionResult`].

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::error::RunError;
use crate::report::Reporter;
use crate::session::{InteractiveSession, PtySession};
use crate::suite::{Interaction, InteractionKind};

/// Sentinel exit code for interactive-protocol faults (pattern never
/// matched, pty error). Distinct from any real exit status so a negated
/// command still counts the session as failed.
pub const INTERACTIVE_FAULT_EXIT: i32 = -1024;

/// How a shell command was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    /// Plain subprocess with separately captured streams
    Direct,
    /// Pty-driven session — streams are not separated
    Interactive,
}

/// Outcome of one shell command.
#[derive(Debug)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    /// Empty for interactive sessions
    pub stderr: String,
    pub kind: ExecutionKind,
}

/// Where relative executable paths resolve from.
pub struct ResolveContext<'a> {
    /// Alias table: short command name → target path
    pub aliases: &'a std::collections::HashMap<String, String>,
    /// Directory of the owning spec file, for direct relative references
    pub spec_dir: Option<&'a Path>,
    /// Base for relative alias targets (the engine's own location)
    pub alias_base: &'a Path,
}

/// Resolve a command token to the path handed to the OS.
///
/// Alias targets substitute the token first. An absolute result is used
/// as-is; a result containing a separator resolves relative to the spec
/// file's directory (direct reference) or the engine's location (alias);
/// a bare name is left for system command lookup.
pub fn resolve_executable(token: &str, ctx: &ResolveContext<'_>) -> String {
    let is_alias = ctx.aliases.contains_key(token);
    let target = ctx
        .aliases
        .get(token)
        .map(String::as_str)
        .unwrap_or(token);

    if Path::new(target).is_absolute() {
        return target.to_string();
    }
    if target.contains('/') {
        let base: PathBuf = if is_alias {
            ctx.alias_base.to_path_buf()
        } else {
            ctx.spec_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        };
        return base.join(target).to_string_lossy().into_owned();
    }
    target.to_string()
}

/// Run a command directly, capturing stdout and stderr separately.
///
/// The inherited process environment is overlaid with `env`. A timeout or a
/// missing executable is a command failure, never an engine crash.
pub fn run_direct(
    program: &str,
    args: &[String],
    env: &[(String, String)],
    cwd: &Path,
    timeout: Duration,
) -> Result<ExecutionResult, RunError> {
    let mut cmd = ProcessCommand::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunError::exec(format!("executable not found: {}", program))
        } else {
            RunError::exec(format!("failed to execute '{}': {}", program, e))
        }
    })?;

    // Drain the pipes through a channel so the read wait is bounded by the
    // same deadline as the process wait. A grandchild inheriting the pipes
    // keeps them open past the child's exit; the deadline still applies.
    let (tx, chunks) = mpsc::channel();
    drain_pipe(child.stdout.take(), 0, tx.clone());
    drain_pipe(child.stderr.take(), 1, tx);

    let deadline = Instant::now() + timeout;
    let timeout_error =
        || RunError::timeout(format!("command timed out: {} {}", program, args.join(" ")));

    let mut captured: [Vec<u8>; 2] = [Vec::new(), Vec::new()];
    loop {
        let now = Instant::now();
        if now >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(timeout_error());
        }
        match chunks.recv_timeout(deadline - now) {
            Ok((stream, chunk)) => captured[stream].extend_from_slice(&chunk),
            Err(RecvTimeoutError::Timeout) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timeout_error());
            }
            // Both pipes hit end of output
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Pipes are closed; reap the exit status, still bounded by the deadline
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(timeout_error());
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    };

    let [stdout, stderr] = captured;
    Ok(ExecutionResult {
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        kind: ExecutionKind::Direct,
    })
}

fn drain_pipe(
    pipe: Option<impl Read + Send + 'static>,
    stream: usize,
    tx: mpsc::Sender<(usize, Vec<u8>)>,
) {
    std::thread::spawn(move || {
        let Some(mut pipe) = pipe else { return };
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Run a command attached to a pseudo-terminal, replaying interactions in
/// strict order, then waiting for end-of-output and termination.
///
/// An interactive-protocol fault yields [`INTERACTIVE_FAULT_EXIT`] rather
/// than propagating as an error; the process is killed and the output
/// captured so far is preserved.
pub fn run_interactive(
    program: &str,
    args: &[String],
    env: &[(String, String)],
    cwd: &Path,
    interactions: &[Interaction],
    timeout: Duration,
    reporter: &Reporter,
) -> Result<ExecutionResult, RunError> {
    let mut session = PtySession::spawn(program, args, env, cwd)?;

    let fault = replay(&mut session, interactions, timeout, reporter).err();

    let exit_code = match fault {
        None => match session.finish(timeout) {
            Ok(code) => {
                reporter.interaction("exit", &code.to_string());
                code
            }
            Err(e) => {
                reporter.interaction("error", &e.message);
                session.abort();
                INTERACTIVE_FAULT_EXIT
            }
        },
        Some(e) => {
            reporter.interaction("error", &e.message);
            session.abort();
            INTERACTIVE_FAULT_EXIT
        }
    };

    Ok(ExecutionResult {
        exit_code,
        stdout: session.output().to_string(),
        stderr: String::new(),
        kind: ExecutionKind::Interactive,
    })
}

fn replay(
    session: &mut dyn InteractiveSession,
    interactions: &[Interaction],
    timeout: Duration,
    reporter: &Reporter,
) -> Result<(), RunError> {
    for interaction in interactions {
        match interaction.kind {
            InteractionKind::Expect => {
                reporter.interaction("expect", &interaction.text);
                session.expect(&interaction.text, timeout)?;
            }
            InteractionKind::SendLine => {
                reporter.interaction("send", &interaction.text);
                session.send_line(&interaction.text)?;
            }
        }
    }
    Ok(())
}
