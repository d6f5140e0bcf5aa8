//! Process execution
//!
//! Every step is reduced to `CommandSpec`s and handed to a `CommandRunner`.
//! `SystemCommandRunner` spawns real processes on the tokio runtime.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, RunnerError};
use crate::secrets::Secret;

/// A single process invocation
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Written to the process stdin, then stdin is closed
    pub stdin: Option<Secret>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            stdin: None,
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

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, secret: Secret) -> Self {
        self.stdin = Some(secret);
        self
    }

    /// First argument, which names the subcommand for git and engines
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        if self.stdin.is_some() {
            write!(f, " < ***")?;
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` and waits for it to exit
    ///
    /// A non-zero exit status is returned as output, not as an error.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Spawning: {}", spec);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| RunnerError::process(&spec.program, e))?;

        if let (Some(secret), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            match stdin.write_all(secret.expose().as_bytes()).await {
                Ok(()) => {}
                // The child exited without reading; its status and stderr say why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("{} closed stdin before reading it", spec.program);
                }
                Err(e) => return Err(RunnerError::process(&spec.program, e)),
            }
            // Dropping the handle closes the pipe so the child sees EOF
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RunnerError::process(&spec.program, e))?;

        // Killed by a signal: no exit code, still a failure
        let exit_code = output.status.code().unwrap_or(1);

        debug!(
            "Command finished: program={} exit_code={} stdout_len={} stderr_len={}",
            spec.program,
            exit_code,
            output.stdout.len(),
            output.stderr.len()
        );

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording runner for executor tests

    use super::*;
    use std::sync::Mutex;

    /// Records every command and fails the ones matching a rule
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
        failures: Vec<(String, i32)>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every command whose subcommand is `subcommand` exit with `code`
        pub fn fail_on(mut self, subcommand: &str, code: i32) -> Self {
            self.failures.push((subcommand.to_string(), code));
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn subcommands(&self) -> Vec<String> {
            self.calls()
                .iter()
                .map(|c| c.subcommand().unwrap_or_default().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(spec.clone());

            let exit_code = self
                .failures
                .iter()
                .find(|(sub, _)| Some(sub.as_str()) == spec.subcommand())
                .map(|(_, code)| *code)
                .unwrap_or(0);

            Ok(CommandOutput {
                stdout: format!("ran {}", spec.program),
                stderr: String::new(),
                exit_code,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_and_hides_stdin() {
        let spec = CommandSpec::new("docker")
            .args(["login", "docker.io", "--username", "octo", "--password-stdin"])
            .stdin(Secret::new("hunter2"));
        let rendered = spec.to_string();
        assert_eq!(
            rendered,
            "docker login docker.io --username octo --password-stdin < ***"
        );
        assert!(!rendered.contains("hunter2"));

        let spec = CommandSpec::new("sh").args(["-c", "make lint"]);
        assert_eq!(spec.to_string(), "sh -c 'make lint'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let output = SystemCommandRunner.run(&spec).await.unwrap();

        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_feeds_stdin() {
        let spec = CommandSpec::new("cat").stdin(Secret::new("hunter2"));
        let output = SystemCommandRunner.run(&spec).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "hunter2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_keeps_status_when_stdin_unread() {
        // Larger than a pipe buffer, so the write outlives the child
        let payload = "x".repeat(1024 * 1024);
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo 'unknown flag' >&2; exit 7"])
            .stdin(Secret::new(payload));
        let output = SystemCommandRunner.run(&spec).await.unwrap();

        assert_eq!(output.exit_code, 7);
        assert_eq!(output.stderr.trim(), "unknown flag");
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let spec = CommandSpec::new("hoist-definitely-not-a-real-binary");
        let err = SystemCommandRunner.run(&spec).await.unwrap_err();
        assert!(matches!(err, RunnerError::Process { .. }));
    }
}
