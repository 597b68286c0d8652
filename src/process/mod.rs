//! Process runner capability used for bridging, unmounting, and ssh.
//!
//! Everything that spawns a local program goes through [`CommandRunner`] so
//! tests can substitute a scripted runner and assert on the exact argument
//! vectors that would have been executed.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use thiserror::Error;

mod util;

pub use util::{expand_tilde, find_program};

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Renders the exit status for error messages.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Errors raised when a program cannot be executed at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RunnerError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError>;

    /// Runs `program` attached to the caller's terminal and returns its exit
    /// code.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started.
    fn run_interactive(&self, program: &str, args: &[OsString])
    -> Result<Option<i32>, RunnerError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| spawn_error(program, &err))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_interactive(
        &self,
        program: &str,
        args: &[OsString],
    ) -> Result<Option<i32>, RunnerError> {
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|err| spawn_error(program, &err))?;
        Ok(status.code())
    }
}

fn spawn_error(program: &str, err: &std::io::Error) -> RunnerError {
    RunnerError::Spawn {
        program: program.to_owned(),
        message: err.to_string(),
    }
}
