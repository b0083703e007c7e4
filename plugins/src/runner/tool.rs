use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use fabflow_core::error::ToolError;
use fabflow_core::task::CancelToken;
use tokio::process::Command;
use tokio::runtime::Handle;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// stdout and stderr are appended here; discarded when `None`.
    pub log_file: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            log_file: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Shell-like rendering for logs and `.cmd` files.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    Exited(i32),
    Cancelled,
}

impl ToolOutcome {
    pub fn success(self) -> bool {
        self == ToolOutcome::Exited(0)
    }
}

/// Runs tools as monitored subprocesses.
///
/// `run` blocks the calling thread on the given runtime handle, so it must be
/// called from a blocking context (a `spawn_blocking` thread or a plain
/// thread), never from inside an async task.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    handle: Handle,
    poll_interval: Duration,
}

impl ToolRunner {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Looks `program` up like the shell would.
    pub fn resolve(program: &str) -> Result<PathBuf, ToolError> {
        which::which(program).map_err(|_| ToolError::NotFound(program.to_string()))
    }

    pub fn run(&self, cmd: &ToolCommand, cancel: &CancelToken) -> Result<ToolOutcome, ToolError> {
        self.handle.block_on(self.run_async(cmd, cancel))
    }

    pub async fn run_async(
        &self,
        cmd: &ToolCommand,
        cancel: &CancelToken,
    ) -> Result<ToolOutcome, ToolError> {
        let program = Self::resolve(&cmd.program)?;
        tracing::info!(cwd = %cmd.cwd.display(), "running: {}", cmd.command_line());

        let mut command = Command::new(&program);
        command
            .args(&cmd.args)
            .current_dir(&cmd.cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match &cmd.log_file {
            Some(path) => {
                let io_err = |source| ToolError::Io {
                    context: format!("opening log {}", path.display()),
                    source,
                };
                let out = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(io_err)?;
                let err = out.try_clone().map_err(io_err)?;
                command.stdout(Stdio::from(out)).stderr(Stdio::from(err));
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let mut child = command
            .spawn()
            .map_err(|e| ToolError::Spawn(format!("{}: {e}", cmd.program)))?;

        let mut tick = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(|source| ToolError::Io {
                        context: format!("waiting for {}", cmd.program),
                        source,
                    })?;
                    let code = status.code().unwrap_or(-1);
                    tracing::debug!(program = %cmd.program, code, "tool exited");
                    return Ok(ToolOutcome::Exited(code));
                }
                _ = tick.tick() => {
                    if cancel.is_cancelled() {
                        tracing::warn!(program = %cmd.program, "cancel requested, killing tool");
                        let _ = child.kill().await;
                        return Ok(ToolOutcome::Cancelled);
                    }
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn runner(rt: &tokio::runtime::Runtime) -> ToolRunner {
        ToolRunner::new(rt.handle().clone()).with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn exit_code_and_log_are_captured() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("tool.log");
        std::fs::write(&log, "# header\n").unwrap();

        let cmd = ToolCommand::new("sh", dir.path())
            .args(["-c", "echo packed; echo oops >&2; exit 3"])
            .log_to(&log);
        let outcome = runner(&rt).run(&cmd, &CancelToken::new()).unwrap();

        assert_eq!(outcome, ToolOutcome::Exited(3));
        assert!(!outcome.success());
        let text = std::fs::read_to_string(&log).unwrap();
        assert!(text.starts_with("# header\n"));
        assert!(text.contains("packed"));
        assert!(text.contains("oops"));
    }

    #[test]
    fn missing_program_is_not_found() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let cmd = ToolCommand::new("definitely-not-an-eda-tool", ".");
        let err = runner(&rt).run(&cmd, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn cancellation_kills_the_child() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let started = Instant::now();
        let cmd = ToolCommand::new("sleep", ".").arg("30");
        let outcome = runner(&rt).run(&cmd, &cancel).unwrap();

        assert_eq!(outcome, ToolOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn command_line_joins_args() {
        let cmd = ToolCommand::new("vpr", ".").args(["arch.xml", "top.blif", "--pack"]);
        assert_eq!(cmd.command_line(), "vpr arch.xml top.blif --pack");
    }
}
