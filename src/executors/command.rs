use super::interrupt::{Interrupt, StepSignals};
use crate::core::errors::ExecError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

const STDERR_TAIL_LINES: usize = 10;
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Where a step's stdout goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutSink {
    /// Redirected verbatim into the step's raw log.
    File(PathBuf),
    /// Read line by line into the debug log.
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdout: StdoutSink,
}

impl StepCommand {
    /// Shell-quoted rendering for the console and the report.
    pub fn display(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(ExecError),
    TimedOut,
    Interrupted(Interrupt),
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: RunOutcome,
    pub duration: Duration,
}

/// Seam between the pipeline and real processes.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(&self, command: &StepCommand, cwd: &Path, timeout: Duration, signals: &StepSignals) -> Execution;
}

pub struct ProcessRunner;

#[async_trait]
impl StepRunner for ProcessRunner {
    async fn run(&self, command: &StepCommand, cwd: &Path, timeout: Duration, signals: &StepSignals) -> Execution {
        execute(command, cwd, timeout, signals).await
    }
}

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    Deadline,
    Interrupted,
}

/// Runs one external command to completion, deadline, or interrupt. The
/// process group is killed and reaped on the latter two.
pub async fn execute(command: &StepCommand, cwd: &Path, limit: Duration, signals: &StepSignals) -> Execution {
    let start = Instant::now();
    let tool = command.program.as_str();

    tracing::debug!("Executing: {} in {:?}", command.display(), cwd);

    let mut std_cmd = std::process::Command::new(tool);
    std_cmd
        .args(&command.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stderr(Stdio::piped());

    // Own process group: terminal Ctrl-C reaches us, not the tool, and a
    // timeout can take down anything the tool spawned.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }

    match &command.stdout {
        StdoutSink::File(path) => match std::fs::File::create(path) {
            Ok(file) => {
                std_cmd.stdout(Stdio::from(file));
            }
            Err(e) => return spawn_failure(tool, start, format!("cannot create {:?}: {}", path, e)),
        },
        StdoutSink::Capture => {
            std_cmd.stdout(Stdio::piped());
        }
    }

    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return spawn_failure(tool, start, format!("failed to spawn {}: {}", tool, e)),
    };

    let stdout_task = child.stdout.take().map(|out| {
        let tool = tool.to_string();
        tokio::spawn(async move {
            read_lines(BufReader::new(out), |line| tracing::debug!("[{}] {}", tool, line)).await
        })
    });
    let stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(read_lines(BufReader::new(err), |_| {})));

    let waited = tokio::select! {
        status = child.wait() => Waited::Exited(status),
        _ = tokio::time::sleep(limit) => Waited::Deadline,
        _ = signals.cancelled() => Waited::Interrupted,
    };

    let outcome = match waited {
        Waited::Exited(Ok(status)) if status.success() => RunOutcome::Completed,
        Waited::Exited(Ok(status)) => {
            let stderr = drain(stderr_task).await;
            RunOutcome::Failed(ExecError {
                tool: tool.to_string(),
                exit_code: status.code(),
                stderr_tail: tail(&stderr),
                duration_ms: start.elapsed().as_millis(),
            })
        }
        Waited::Exited(Err(e)) => RunOutcome::Failed(ExecError {
            tool: tool.to_string(),
            exit_code: None,
            stderr_tail: format!("Process error: {}", e),
            duration_ms: start.elapsed().as_millis(),
        }),
        Waited::Deadline => {
            tracing::warn!("{} exceeded its {}s timeout, terminating", tool, limit.as_secs());
            terminate(&mut child).await;
            RunOutcome::TimedOut
        }
        Waited::Interrupted => {
            let interrupt = signals.interrupt();
            tracing::warn!("{} interrupted by operator ({:?}), terminating", tool, interrupt);
            terminate(&mut child).await;
            RunOutcome::Interrupted(interrupt)
        }
    };

    drain(stdout_task).await;

    Execution {
        outcome,
        duration: start.elapsed(),
    }
}

fn spawn_failure(tool: &str, start: Instant, reason: String) -> Execution {
    tracing::error!("{}", reason);
    Execution {
        outcome: RunOutcome::Failed(ExecError {
            tool: tool.to_string(),
            exit_code: None,
            stderr_tail: reason,
            duration_ms: start.elapsed().as_millis(),
        }),
        duration: start.elapsed(),
    }
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain syscall on a process group we created; failure is harmless.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!("kill after group kill: {}", e);
    }
}

/// Output readers can outlive the process when a grandchild holds the pipe;
/// give them a short grace period and move on.
async fn drain(task: Option<JoinHandle<String>>) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(Ok(output)) => output,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}

async fn read_lines<R>(reader: BufReader<R>, mut on_line: impl FnMut(&str)) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    let mut reader = reader.lines();

    while let Ok(Some(line)) = reader.next_line().await {
        on_line(&line);
        lines.push(line);
    }

    lines.join("\n")
}

fn tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n")
}
