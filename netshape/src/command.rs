//! Privileged and shell command execution.
//!
//! Everything `netshape` does to the kernel goes through one of the two traits in this module:
//! [`Privileged`] for `tc`, `ip` and `modprobe` invocations, and [`ShellRunner`] for the single
//! raw pipeline used to look up the default route. Keeping them behind traits lets callers swap
//! in a dry-run printer or a fake kernel.

use std::{io, process};

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty command provided")]
    Empty,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("non-zero exit status ({}): {}", .0.status_text(), .0.stderr.trim())]
    NonZero(Output),
}

impl Error {
    /// The captured stderr of the failing command, if it ran at all.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::NonZero(output) => Some(&output.stderr),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Exit code, `None` when the process was killed by a signal or never spawned.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Default for Output {
    /// An empty, successful output.
    fn default() -> Self {
        Self::with_stdout("")
    }
}

impl Output {
    /// A successful output with the given stdout and no stderr.
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self { code: Some(0), stdout: stdout.into(), stderr: String::new() }
    }

    /// A failed output (exit code 2, like `tc` and `ip`) with the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self { code: Some(2), stdout: String::new(), stderr: stderr.into() }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

impl From<process::Output> for Output {
    fn from(value: process::Output) -> Self {
        Self {
            code: value.status.code(),
            stdout: String::from_utf8_lossy(&value.stdout).to_string(),
            stderr: String::from_utf8_lossy(&value.stderr).to_string(),
        }
    }
}

/// Runs commands with elevated privileges.
///
/// Implementations must return [`Error::NonZero`] when the command exits unsuccessfully, carrying
/// the captured output so callers can inspect stderr.
#[async_trait::async_trait]
pub trait Privileged: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<Output>;
}

/// Runs a raw shell pipeline and returns whatever it printed. A non-zero exit is not an error.
#[async_trait::async_trait]
pub trait ShellRunner: Send + Sync {
    async fn shell(&self, script: &str) -> Result<Output>;
}

#[async_trait::async_trait]
impl<T: Privileged + ?Sized> Privileged for std::sync::Arc<T> {
    async fn run(&self, args: &[String]) -> Result<Output> {
        (**self).run(args).await
    }
}

#[async_trait::async_trait]
impl<T: ShellRunner + ?Sized> ShellRunner for std::sync::Arc<T> {
    async fn shell(&self, script: &str) -> Result<Output> {
        (**self).shell(script).await
    }
}

/// Spawns `program args...`, waits for it and maps a non-zero exit into [`Error::NonZero`].
async fn spawn_checked(mut cmd: Command) -> Result<Output> {
    cmd.stdin(process::Stdio::null())
        .stdout(process::Stdio::piped())
        .stderr(process::Stdio::piped());

    tracing::debug!(?cmd, "running command");

    let output: Output = cmd.output().await?.into();

    if !output.success() {
        tracing::debug!(?output.stderr, ?output.code, ?cmd, "command returned non-zero status");
        return Err(Error::NonZero(output));
    }

    Ok(output)
}

/// Elevates every command through `sudo`.
#[derive(Debug, Clone)]
pub struct Sudo {
    program: String,
    non_interactive: bool,
}

impl Default for Sudo {
    fn default() -> Self {
        Self { program: "sudo".to_string(), non_interactive: false }
    }
}

impl Sudo {
    /// Use a different elevation program, e.g. `doas`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Pass `-n` so that `sudo` fails instead of prompting for a password.
    pub fn non_interactive(mut self, non_interactive: bool) -> Self {
        self.non_interactive = non_interactive;
        self
    }

    /// Builds the command that would run `args` with elevated privileges.
    pub fn build(&self, args: &[String]) -> Result<Command> {
        if args.is_empty() {
            return Err(Error::Empty);
        }

        let mut cmd = Command::new(&self.program);
        if self.non_interactive {
            cmd.arg("-n");
        }
        cmd.args(args);

        Ok(cmd)
    }
}

#[async_trait::async_trait]
impl Privileged for Sudo {
    async fn run(&self, args: &[String]) -> Result<Output> {
        spawn_checked(self.build(args)?).await
    }
}

/// Runs commands directly, for processes that already hold `CAP_NET_ADMIN` (e.g. a root shell).
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

#[async_trait::async_trait]
impl Privileged for Direct {
    async fn run(&self, args: &[String]) -> Result<Output> {
        let (program, rest) = args.split_first().ok_or(Error::Empty)?;
        let mut cmd = Command::new(program);
        cmd.args(rest);

        spawn_checked(cmd).await
    }
}

/// Runs pipelines through `sh -c`.
#[derive(Debug, Clone)]
pub struct Shell {
    program: String,
}

impl Default for Shell {
    fn default() -> Self {
        Self { program: "sh".to_string() }
    }
}

#[async_trait::async_trait]
impl ShellRunner for Shell {
    async fn shell(&self, script: &str) -> Result<Output> {
        if script.trim().is_empty() {
            return Err(Error::Empty);
        }

        let mut cmd = Command::new(&self.program);
        cmd.arg("-c")
            .arg(script)
            .stdin(process::Stdio::null())
            .stdout(process::Stdio::piped())
            .stderr(process::Stdio::piped());

        tracing::debug!(?cmd, "running shell pipeline");

        Ok(cmd.output().await?.into())
    }
}

/// Converts a list of string-like arguments into owned arguments for [`Privileged::run`].
pub fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
