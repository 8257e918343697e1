/// Command execution for the external cluster scripts
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::utils::console;

/// Why a command invocation did not complete cleanly
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Can't shell out due to issues with {0}")]
    Pipe(&'static str),

    #[error("Can't shell out due to issues with starting command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Something bad happened after command completed: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Something bad happened after command completed: {0}")]
    Exit(ExitStatus),

    #[error("Command did not finish within {} seconds and was killed", .0.as_secs_f64())]
    TimedOut(Duration),
}

/// How the child's stdout is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Echo stdout and stderr line by line to our stdout
    Stream,
    /// Echo stderr, accumulate stdout into one string
    Capture,
}

/// Result from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Captured stdout lines concatenated without separators (capture mode only)
    pub stdout: String,
    pub success: bool,
}

/// Builder for executing external commands
pub struct CommandBuilder {
    command: Command,
    shown: String,
    timeout: Option<Duration>,
}

impl CommandBuilder {
    /// Create a new command builder; the child inherits our environment
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let shown = program.as_ref().to_string_lossy().into_owned();
        let mut command = Command::new(program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Self {
            command,
            shown,
            timeout: None,
        }
    }

    /// Add a single argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.shown.push(' ');
        self.shown.push_str(&arg.as_ref().to_string_lossy());
        self.command.arg(arg);
        self
    }

    /// Kill the child and everything it started if it runs longer than `timeout`
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        // Separate process group so a timeout kills the whole script tree.
        // Without a limit the script stays in ours and receives Ctrl-C.
        #[cfg(unix)]
        if timeout.is_some() {
            self.command.process_group(0);
        }
        self.timeout = timeout;
        self
    }

    /// Run while echoing both output streams; failures are reported, not returned
    pub async fn stream(self) -> CommandOutput {
        self.execute(OutputMode::Stream).await
    }

    /// Run and return stdout; stderr is echoed. Yields an empty string if the
    /// command could not be started.
    pub async fn capture(self) -> CommandOutput {
        self.execute(OutputMode::Capture).await
    }

    async fn execute(self, mode: OutputMode) -> CommandOutput {
        let shown = self.shown.clone();
        match self.try_execute(mode).await {
            Ok(stdout) => CommandOutput {
                stdout,
                success: true,
            },
            Err((err, stdout)) => {
                debug!("{} failed: {:?}", shown, err);
                console::error(&err);
                CommandOutput {
                    stdout,
                    success: false,
                }
            }
        }
    }

    /// On failure, also hands back whatever stdout was captured before it
    async fn try_execute(mut self, mode: OutputMode) -> Result<String, (RunError, String)> {
        debug!("Running {} ({:?})", self.shown, mode);

        let mut child = self
            .command
            .spawn()
            .map_err(|e| (RunError::Spawn(e), String::new()))?;

        let Some(stderr) = child.stderr.take() else {
            return Err((RunError::Pipe("stderr"), String::new()));
        };
        let Some(stdout) = child.stdout.take() else {
            return Err((RunError::Pipe("stdout"), String::new()));
        };

        let stderr_drain = tokio::spawn(echo(stderr));
        let stdout_drain = match mode {
            OutputMode::Stream => tokio::spawn(async move {
                echo(stdout).await;
                String::new()
            }),
            OutputMode::Capture => tokio::spawn(slurp(stdout)),
        };

        let status = match wait(&mut child, self.timeout).await {
            // Processes that escaped the kill may still hold the pipes open
            Err(err @ RunError::TimedOut(_)) => {
                stderr_drain.abort();
                stdout_drain.abort();
                return Err((err, String::new()));
            }
            status => status,
        };

        if let Err(e) = stderr_drain.await {
            debug!("stderr drain ended abnormally: {}", e);
        }
        let captured = stdout_drain.await.unwrap_or_default();

        match status {
            Ok(status) if status.success() => {
                debug!("{} exited with {}", self.shown, status);
                Ok(captured)
            }
            Ok(status) => Err((RunError::Exit(status), captured)),
            Err(e) => Err((e, captured)),
        }
    }
}

async fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, RunError> {
    let Some(limit) = timeout else {
        return child.wait().await.map_err(RunError::Wait);
    };

    let waited = tokio::time::timeout(limit, child.wait()).await;
    match waited {
        Ok(status) => status.map_err(RunError::Wait),
        Err(_) => {
            kill_group(child);
            if let Err(e) = child.kill().await {
                debug!("Failed to kill timed out command: {}", e);
            }
            Err(RunError::TimedOut(limit))
        }
    }
}

/// Kill the process group led by the child, taking its descendants with it
#[cfg(unix)]
fn kill_group(child: &Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    let result = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if result != 0 {
        debug!(
            "Failed to kill process group {}: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// Print the stream line by line as lines arrive
async fn echo<R: AsyncRead + Unpin>(reader: R) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => println!("{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading command output: {}", e);
                break;
            }
        }
    }
}

/// Collect the stream into one string, dropping line breaks
async fn slurp<R: AsyncRead + Unpin>(reader: R) -> String {
    let mut buf = String::new();
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => buf.push_str(&line),
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading command output: {}", e);
                break;
            }
        }
    }
    buf
}
