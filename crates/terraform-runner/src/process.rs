//! Blocking child-process execution with output capture.
//!
//! Stdout and stderr are drained on helper threads, logged line by line, and
//! collected for the caller. The calling thread polls the child so that an
//! [`InterruptFlag`] can stop it mid-run.

use crate::errors::TerraformError;
use crate::interrupt::InterruptFlag;
use regex::Regex;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::LazyLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Interval between child status checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum length of stderr carried in error messages.
const MAX_STDERR_LEN: usize = 4096;

/// ANSI escape sequences (colour and cursor control).
#[allow(clippy::expect_used)] // Static pattern, exercised by unit tests
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ANSI escape pattern is valid")
});

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Whether a running child may be stopped by the interrupt flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruptible {
    Yes,
    No,
}

/// Run `command` to completion.
///
/// `label` names the subcommand in logs and errors. Spawn failures are
/// returned as-is so the caller can classify them.
pub fn run(
    mut command: Command,
    label: &str,
    interrupt: &InterruptFlag,
    interruptible: Interruptible,
) -> Result<ProcessOutput, RunError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(RunError::Spawn)?;
    let stdout = child.stdout.take().map(|pipe| drain(pipe, label, Stream::Stdout));
    let stderr = child.stderr.take().map(|pipe| drain(pipe, label, Stream::Stderr));

    let started = Instant::now();
    let status = wait(&mut child, label, interrupt, interruptible);

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    match status {
        Ok(status) => {
            info!(
                command = label,
                status = %status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "terraform finished"
            );
            Ok(ProcessOutput {
                status,
                stdout,
                stderr,
            })
        }
        Err(WaitError::Interrupted) => Err(RunError::Interrupted),
        Err(WaitError::Io(e)) => Err(RunError::Wait(e)),
    }
}

/// Failures of [`run`] before an exit status is available.
#[derive(Debug)]
pub enum RunError {
    Spawn(io::Error),
    Wait(io::Error),
    Interrupted,
}

impl RunError {
    /// Convert into a [`TerraformError`] for `command`.
    pub fn into_terraform_error(self, command: &str, binary: &std::path::Path) -> TerraformError {
        match self {
            RunError::Spawn(e) if e.kind() == io::ErrorKind::NotFound => {
                TerraformError::BinaryNotFound {
                    binary: binary.to_path_buf(),
                }
            }
            RunError::Spawn(source) | RunError::Wait(source) => TerraformError::Spawn {
                command: command.to_string(),
                source,
            },
            RunError::Interrupted => TerraformError::Interrupted {
                command: command.to_string(),
            },
        }
    }
}

enum WaitError {
    Interrupted,
    Io(io::Error),
}

fn wait(
    child: &mut Child,
    label: &str,
    interrupt: &InterruptFlag,
    interruptible: Interruptible,
) -> Result<ExitStatus, WaitError> {
    loop {
        if let Some(status) = child.try_wait().map_err(WaitError::Io)? {
            return Ok(status);
        }

        if interruptible == Interruptible::Yes && interrupt.is_raised() {
            warn!(command = label, pid = child.id(), "Termination requested, stopping terraform");
            stop(child);
            // Reap the child; its exit status is irrelevant once interrupted.
            let _ = child.wait();
            return Err(WaitError::Interrupted);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Ask the child to stop. Terraform treats SIGINT as a graceful cancel and
/// releases state locks before exiting.
#[cfg(unix)]
fn stop(child: &mut Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // SAFETY: `pid` belongs to a child we spawned and have not yet reaped.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn stop(child: &mut Child) {
    let _ = child.kill();
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn drain<R>(pipe: R, label: &str, stream: Stream) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    let label = label.to_string();
    thread::spawn(move || {
        let mut captured = String::new();
        // Split on raw bytes so a non-UTF-8 line cannot stop the drain and
        // leave the child writing into a closed pipe.
        for line in BufReader::new(pipe).split(b'\n') {
            let Ok(line) = line else { break };
            let line = String::from_utf8_lossy(&line);
            match stream {
                Stream::Stdout => debug!(command = %label, "{}", line),
                Stream::Stderr => debug!(command = %label, stream = "stderr", "{}", line),
            }
            captured.push_str(&line);
            captured.push('\n');
        }
        captured
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Strip ANSI escapes and bound the length of captured stderr.
pub fn sanitize_stderr(stderr: &str) -> String {
    let cleaned = ANSI_ESCAPE.replace_all(stderr.trim(), "");
    if cleaned.len() <= MAX_STDERR_LEN {
        return cleaned.into_owned();
    }

    let mut end = MAX_STDERR_LEN;
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", cleaned.get(..end).unwrap_or_default())
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        command
    }

    #[test]
    fn test_run_captures_stdout_and_stderr() {
        let output = run(
            sh("echo out; echo err >&2"),
            "apply",
            &InterruptFlag::new(),
            Interruptible::Yes,
        )
        .expect("sh should run");

        assert!(output.status.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[test]
    fn test_non_utf8_output_keeps_draining() {
        let output = run(
            sh("printf '\\377\\n'; head -c 300000 /dev/zero | tr '\\0' a; echo; echo done"),
            "destroy",
            &InterruptFlag::new(),
            Interruptible::No,
        )
        .expect("sh should run");

        assert!(output.status.success(), "child should not die of SIGPIPE: {:?}", output.status);
        assert!(output.stdout.starts_with('\u{FFFD}'));
        assert!(output.stdout.ends_with("done\n"));
        assert!(output.stdout.len() > 300_000);
    }

    #[test]
    fn test_run_reports_non_zero_status() {
        let output = run(sh("exit 3"), "apply", &InterruptFlag::new(), Interruptible::Yes)
            .expect("sh should run");

        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_missing_binary_maps_to_binary_not_found() {
        let err = run(
            Command::new("definitely-not-terraform-binary"),
            "init",
            &InterruptFlag::new(),
            Interruptible::Yes,
        )
        .expect_err("spawn should fail");

        let err = err.into_terraform_error("init", std::path::Path::new("definitely-not-terraform-binary"));
        assert!(matches!(err, TerraformError::BinaryNotFound { .. }));
    }

    #[test]
    fn test_interrupt_stops_running_child() {
        let flag = InterruptFlag::new();
        let trigger = flag.clone();
        let started = Instant::now();

        let signaller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            trigger.trigger();
        });

        let result = run(sh("exec sleep 30"), "apply", &flag, Interruptible::Yes);
        signaller.join().unwrap();

        assert!(matches!(result, Err(RunError::Interrupted)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_uninterruptible_child_runs_to_completion() {
        let flag = InterruptFlag::new();
        flag.trigger();

        let output = run(sh("sleep 0.3; echo done"), "destroy", &flag, Interruptible::No)
            .expect("destroy should not be interrupted");

        assert!(output.status.success());
        assert_eq!(output.stdout, "done\n");
    }

    #[test]
    fn test_sanitize_strips_ansi_escapes() {
        let raw = "\x1b[31m\x1b[1mError:\x1b[0m Invalid reference\n";
        assert_eq!(sanitize_stderr(raw), "Error: Invalid reference");
    }

    #[test]
    fn test_sanitize_truncates_long_stderr() {
        let raw = "x".repeat(MAX_STDERR_LEN + 100);
        let sanitized = sanitize_stderr(&raw);

        assert!(sanitized.ends_with("... (truncated)"));
        assert!(sanitized.len() < raw.len());
    }
}
