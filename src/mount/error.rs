//! Errors raised by the mount supervisor.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::process::RunnerError;

/// Errors raised while attaching, detaching, or sampling the bridge.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MountError {
    /// Raised when bridging is attempted as root.
    #[error("cannot mount the file system as root/superuser")]
    Superuser,
    /// Raised when the mount point cannot be listed.
    #[error("could not read from file system at {path}: {message}")]
    Unreadable {
        /// Mount point that could not be listed.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when no unmount tool is installed.
    #[error("cannot unmount as neither fusermount nor umount are installed on your system")]
    NoUnmountTool,
    /// Raised when a bridging command exits unsuccessfully.
    #[error("{program} exited with status {status_text}: {stderr}")]
    Command {
        /// Program that failed.
        program: String,
        /// Rendered exit status.
        status_text: String,
        /// Captured standard error.
        stderr: String,
    },
    /// Raised when a program cannot be spawned.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}
