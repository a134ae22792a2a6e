//! Interactive pseudo-terminal sessions
//!
//! The engine replays expect/send interactions through the small
//! [`InteractiveSession`] interface; [`PtySession`] is the platform adapter
//! built on `portable-pty`. A dedicated reader thread feeds raw pty output
//! into a channel so pattern waits can be bounded by a timeout.

use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use portable_pty::{native_pty_system, CommandBuilder, PtySize};

use crate::error::RunError;

/// A running interactive process the engine can drive.
pub trait InteractiveSession {
    /// Block until the accumulated output matches `pattern` (a regex) or the
    /// timeout elapses. Each match advances an internal scan offset so a
    /// repeated prompt matches again on the next call.
    fn expect(&mut self, pattern: &str, timeout: Duration) -> Result<(), RunError>;

    /// Write `text` followed by a line terminator to the process's input.
    fn send_line(&mut self, text: &str) -> Result<(), RunError>;

    /// Wait for end-of-output and process termination, bounded by `timeout`.
    /// Returns the exit code.
    fn finish(&mut self, timeout: Duration) -> Result<i32, RunError>;

    /// Everything the process has written so far, carriage returns stripped.
    fn output(&self) -> &str;
}

/// `portable-pty` backed session.
pub struct PtySession {
    child: Box<dyn portable_pty::Child + Send + Sync>,
    // Held so the pty master outlives the reader thread.
    _master: Box<dyn portable_pty::MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    chunks: Receiver<Vec<u8>>,
    /// Accumulated transcript, CR-stripped
    buffer: String,
    /// Byte offset just past the previous expect match
    scan_from: usize,
}

impl PtySession {
    /// Spawn `program` attached to a fresh pty, with the given arguments,
    /// environment entries, and working directory.
    pub fn spawn(
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &std::path::Path,
    ) -> Result<Self, RunError> {
        let pty = native_pty_system();
        let pair = pty
            .openpty(PtySize { rows: 24, cols: 80, pixel_width: 0, pixel_height: 0 })
            .map_err(|e| RunError::session(format!("failed to open pty: {}", e)))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.cwd(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| RunError::session(format!("failed to spawn '{}': {}", program, e)))?;
        // Close our copy of the slave so reads hit EOF when the child exits
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| RunError::session(format!("failed to read pty: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| RunError::session(format!("failed to write pty: {}", e)))?;

        let (tx, chunks) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            child,
            _master: pair.master,
            writer,
            chunks,
            buffer: String::new(),
            scan_from: 0,
        })
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        for c in String::from_utf8_lossy(chunk).chars() {
            if c != '\r' {
                self.buffer.push(c);
            }
        }
    }

    fn compile(pattern: &str) -> Result<regex::Regex, RunError> {
        regex::RegexBuilder::new(pattern)
            .size_limit(1 << 20)
            .build()
            .map_err(|e| RunError::session(format!("invalid expect pattern '{}': {}", pattern, e)))
    }

    /// Kill the process and reap it. For abandoning a session after a
    /// replay fault — the child must not outlive its test case.
    pub fn abort(&mut self) {
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            return;
        }
        let _ = self.child.kill();
        // Signal delivery is asynchronous; poll briefly for the reap
        for _ in 0..100 {
            match self.child.try_wait() {
                Ok(None) => std::thread::sleep(Duration::from_millis(10)),
                _ => return,
            }
        }
    }

    /// Try to match from the scan offset; advance past the match on success.
    fn try_match(&mut self, re: &regex::Regex) -> bool {
        if let Some(m) = re.find(&self.buffer[self.scan_from..]) {
            self.scan_from += m.end();
            true
        } else {
            false
        }
    }
}

impl InteractiveSession for PtySession {
    fn expect(&mut self, pattern: &str, timeout: Duration) -> Result<(), RunError> {
        let re = Self::compile(pattern)?;
        let deadline = Instant::now() + timeout;

        loop {
            if self.try_match(&re) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RunError::timeout(format!(
                    "timed out waiting for pattern: {}",
                    pattern
                )));
            }
            match self.chunks.recv_timeout(deadline - now) {
                Ok(chunk) => self.push_chunk(&chunk),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(RunError::timeout(format!(
                        "timed out waiting for pattern: {}",
                        pattern
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if self.try_match(&re) {
                        return Ok(());
                    }
                    return Err(RunError::session(format!(
                        "end of output before pattern: {}",
                        pattern
                    )));
                }
            }
        }
    }

    fn send_line(&mut self, text: &str) -> Result<(), RunError> {
        self.writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush())
            .map_err(|e| RunError::session(format!("failed to send line: {}", e)))
    }

    fn finish(&mut self, timeout: Duration) -> Result<i32, RunError> {
        let deadline = Instant::now() + timeout;

        // Drain remaining output until the reader thread sees EOF
        loop {
            let now = Instant::now();
            if now >= deadline {
                let _ = self.child.kill();
                return Err(RunError::timeout("timed out waiting for end of output"));
            }
            match self.chunks.recv_timeout(deadline - now) {
                Ok(chunk) => self.push_chunk(&chunk),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    let _ = self.child.kill();
                    return Err(RunError::timeout("timed out waiting for end of output"));
                }
            }
        }

        // Reap the exit status, still bounded by the deadline
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Ok(status.exit_code() as i32),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = self.child.kill();
                        return Err(RunError::timeout("process did not exit after end of output"));
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(RunError::session(format!("failed to reap process: {}", e))),
            }
        }
    }

    fn output(&self) -> &str {
        &self.buffer
    }
}
