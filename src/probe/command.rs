use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use super::ProbeError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Decide whether the command produced usable output.
    ///
    /// A non-zero exit is only fatal when stdout is empty; tools such as
    /// `lsof` exit 1 while still printing what they found.
    pub fn accept(
        self,
        program: &str,
        ok_exit_codes: &[i32],
        quiet_marker: Option<&str>,
    ) -> Result<String, ProbeError> {
        let code = self.status.code();
        let ok = self.status.success() || code.is_some_and(|c| ok_exit_codes.contains(&c));
        if ok || !self.stdout.trim().is_empty() {
            return Ok(self.stdout);
        }

        if let Some(marker) = quiet_marker {
            if self.stderr.contains(marker) {
                return Ok(String::new());
            }
        }

        Err(ProbeError::Failed {
            program: program.into(),
            status: code
                .map(|c| format!("status {c}"))
                .unwrap_or_else(|| "a signal".into()),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Spawn `program` and wait at most `timeout` for it to exit.
///
/// stdout and stderr are drained on their own threads so a chatty child
/// can't block on a full pipe. On timeout the child is killed. The same
/// deadline bounds the drain: a background grandchild that keeps the
/// pipes open after the child exits is reported as a timeout.
pub fn run(program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput, ProbeError> {
    tracing::debug!(program, ?args, "spawning probe command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_rx = spawn_drain(stdout);
    let stderr_rx = spawn_drain(stderr);

    let started = Instant::now();
    let deadline = started + timeout;
    let timed_out = || {
        tracing::warn!(program, timeout_ms = timeout.as_millis() as u64, "probe command killed");
        ProbeError::TimedOut {
            program: program.into(),
            seconds: timeout.as_secs_f64(),
        }
    };
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out());
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(ProbeError::Io {
                    path: program.into(),
                    message: e.to_string(),
                });
            }
        }
    };

    let stdout = collect(&stdout_rx, deadline).ok_or_else(timed_out)?;
    let stderr = collect(&stderr_rx, deadline).ok_or_else(timed_out)?;
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

/// Read a pipe to EOF on a detached thread.
fn spawn_drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(drain(pipe));
    });
    rx
}

/// Wait for a drained pipe until `deadline`. `None` means the pipe was
/// still open when time ran out.
fn collect(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn drain<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn spawn_error(program: &str, err: io::Error) -> ProbeError {
    match err.kind() {
        io::ErrorKind::NotFound => ProbeError::NotInstalled {
            program: program.into(),
        },
        io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied {
            target: program.into(),
        },
        _ => ProbeError::Spawn {
            program: program.into(),
            message: err.to_string(),
        },
    }
}
