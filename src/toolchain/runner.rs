//! External tool invocation.
//!
//! Every toolchain step goes through [`ToolRunner`], which spawns the
//! program, captures its output, and enforces a wall-clock timeout. The
//! process runs in its own process group so a timeout kills the compiler
//! together with everything it spawned.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crate::error::{ForgeError, Result};

/// Output kept per stream; the rest is discarded.
const MAX_CAPTURE_BYTES: usize = 256 * 1024;

/// Extra time the output readers get once the tool has exited or been killed.
const READER_GRACE: Duration = Duration::from_secs(1);

/// A fully specified external tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
    cwd: PathBuf,
    timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Command line for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ToolOutput {
    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        combine(&self.stdout, &self.stderr)
    }
}

fn combine(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim_end();
    let stderr = stderr.trim_end();
    match (stdout.is_empty(), stderr.is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{}\n{}", stdout, stderr),
    }
}

/// Capability to run external tools.
///
/// Fails with [`ForgeError::Build`] on non-zero exit, timeout, or when the
/// program cannot be started.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Runs tools as child processes of the current process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let tool = invocation.program().to_string();
        tracing::debug!(
            tool = %tool,
            cwd = %invocation.cwd().display(),
            timeout_secs = invocation.timeout().as_secs(),
            "Running {}",
            invocation.command_line()
        );

        let mut command = Command::new(invocation.program());
        command
            .args(invocation.get_args())
            .current_dir(invocation.cwd())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| ForgeError::Build {
            tool: tool.clone(),
            output: if e.kind() == io::ErrorKind::NotFound {
                format!("{} is not installed or not on PATH", tool)
            } else {
                format!("failed to start {}: {}", tool, e)
            },
        })?;

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let pid = child.id();
        let waited = wait_with_deadline(&mut child, invocation.timeout(), self.poll_interval);
        // descendants left in the group would keep the pipes open
        if kill_process_group(pid) {
            tracing::debug!(tool = %tool, "Killed processes left behind by {}", tool);
        }

        // a grandchild that left the group can still hold a pipe
        let readers_until = (started + invocation.timeout()).max(Instant::now() + READER_GRACE);
        let stdout = join_reader(stdout, readers_until);
        let stderr = join_reader(stderr, readers_until);
        let duration = started.elapsed();

        let (status, timed_out) = waited.map_err(|e| ForgeError::Build {
            tool: tool.clone(),
            output: format!("failed waiting for {}: {}", tool, e),
        })?;

        if timed_out {
            tracing::warn!(tool = %tool, "Timed out after {:?}", invocation.timeout());
            let captured = combine(&stdout, &stderr);
            return Err(ForgeError::Build {
                output: format!(
                    "timed out after {}s{}{}",
                    invocation.timeout().as_secs(),
                    if captured.is_empty() { "" } else { "\n" },
                    captured
                ),
                tool,
            });
        }

        if !status.success() {
            let captured = combine(&stdout, &stderr);
            tracing::debug!(tool = %tool, %status, "Tool failed");
            return Err(ForgeError::Build {
                output: if captured.is_empty() {
                    format!("exited with {}", status)
                } else {
                    captured
                },
                tool,
            });
        }

        tracing::debug!(tool = %tool, elapsed_ms = duration.as_millis() as u64, "Tool finished");
        Ok(ToolOutput {
            stdout,
            stderr,
            duration,
        })
    }
}

fn spawn_reader<R>(stream: Option<R>) -> Option<Receiver<String>>
where
    R: Read + Send + 'static,
{
    stream.map(|s| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(read_capped(s, MAX_CAPTURE_BYTES));
        });
        rx
    })
}

/// Collect a reader's output, giving up at `deadline`.
fn join_reader(reader: Option<Receiver<String>>, deadline: Instant) -> String {
    let Some(rx) = reader else {
        return String::new();
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => text,
        Err(_) => {
            tracing::debug!("Output pipe still open at deadline, abandoning reader");
            String::new()
        }
    }
}

/// Read a stream to the end, keeping at most `cap` bytes.
fn read_capped<R: Read>(mut reader: R, cap: usize) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        let room = cap.saturating_sub(buf.len());
        if n > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }

    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str("\n[output truncated]");
    }
    text
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    poll: Duration,
) -> io::Result<(ExitStatus, bool)> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            if !kill_process_group(child.id()) {
                let _ = child.kill();
            }
            let status = child.wait()?;
            return Ok((status, true));
        }
        std::thread::sleep(poll);
    }
}

/// SIGKILL the process group led by `pid`. Returns false if nothing was signalled.
#[cfg(unix)]
fn kill_process_group(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(e) => {
            tracing::warn!("Failed to kill process group {}: {}", pgid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) -> bool {
    false
}
