//! Attaching and detaching the sshfs bridge to the workstation.
//!
//! Both directions sample the mount point first so repeated requests are
//! harmless: a populated mount point is never mounted over, and an empty one
//! is never unmounted. Unmounting retries a bounded number of times.

use std::ffi::OsString;
use std::net::IpAddr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::time::sleep;

mod error;
mod probe;

pub use error::MountError;
pub use probe::{DirectoryProbe, MountProbe};

use crate::process::{CommandRunner, find_program};
use crate::resolve::ResolvedParams;

/// Program used to attach the bridge.
pub const SSHFS_BIN: &str = "sshfs";
/// Upper bound on unmount attempts.
pub const MAX_UNMOUNT_ATTEMPTS: u32 = 10;

const UNMOUNT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Everything needed to attach the bridge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MountRequest {
    /// Public address of the machine.
    pub address: IpAddr,
    /// Private key used by sshfs.
    pub credential_file: Utf8PathBuf,
    /// Local mount point.
    pub mount_path: Utf8PathBuf,
    /// Remote login.
    pub remote_user: String,
    /// Remote directory to expose.
    pub remote_dir: String,
}

impl MountRequest {
    /// Builds a request from resolved parameters and a known address.
    #[must_use]
    pub fn new(params: &ResolvedParams, address: IpAddr) -> Self {
        Self {
            address,
            credential_file: params.credential_file.clone(),
            mount_path: params.mount_path.clone(),
            remote_user: params.remote_user.clone(),
            remote_dir: params.remote_dir.clone(),
        }
    }

    /// The fixed `-o` option string passed to sshfs.
    #[must_use]
    pub fn sshfs_options(&self) -> String {
        [
            format!("IdentityFile={}", self.credential_file),
            String::from("Ciphers=aes128-gcm@openssh.com"),
            String::from("workaround=rename"),
            String::from("StrictHostKeyChecking=no"),
            String::from("reconnect"),
            String::from("auto_cache"),
        ]
        .join(",")
    }

    /// The `user@address:dir` source argument passed to sshfs.
    #[must_use]
    pub fn remote_spec(&self) -> String {
        format!("{}@{}:{}", self.remote_user, self.address, self.remote_dir)
    }

    fn sshfs_args(&self) -> Vec<OsString> {
        vec![
            OsString::from(self.remote_spec()),
            OsString::from(self.mount_path.as_str()),
            OsString::from("-o"),
            OsString::from(self.sshfs_options()),
        ]
    }
}

/// Result of a mount request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MountOutcome {
    /// sshfs attached the bridge.
    Connected,
    /// The mount point already had entries; nothing was attempted.
    AlreadyConnected,
}

/// Result of an unmount request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnmountOutcome {
    /// The mount point emptied after `attempts` detach calls.
    Disconnected {
        /// Detach calls issued.
        attempts: u32,
    },
    /// The mount point was already empty; nothing was attempted.
    AlreadyDisconnected,
    /// The mount point was still populated after every attempt.
    StillMounted {
        /// Detach calls issued.
        attempts: u32,
    },
}

/// Local program used to detach the bridge.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnmountTool {
    /// `fusermount -uz`.
    Fusermount,
    /// `umount -f`.
    Umount,
}

impl UnmountTool {
    /// Picks the first tool found on `PATH`.
    #[must_use]
    pub fn detect() -> Option<Self> {
        [Self::Fusermount, Self::Umount]
            .into_iter()
            .find(|tool| find_program(tool.program()).is_some())
    }

    /// Program name.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Fusermount => "fusermount",
            Self::Umount => "umount",
        }
    }

    const fn flag(self) -> &'static str {
        match self {
            Self::Fusermount => "-uz",
            Self::Umount => "-f",
        }
    }

    fn args(self, mount_path: &Utf8Path) -> Vec<OsString> {
        vec![OsString::from(self.flag()), OsString::from(mount_path.as_str())]
    }
}

/// Issues attach and detach requests and samples the mount point.
#[derive(Clone, Debug)]
pub struct MountSupervisor<R: CommandRunner, M: MountProbe> {
    runner: R,
    probe: M,
    superuser: Option<bool>,
    unmount_tool: Option<UnmountTool>,
    retry_interval: Duration,
}

impl<R: CommandRunner, M: MountProbe> MountSupervisor<R, M> {
    /// Creates a supervisor using the unmount tool found on `PATH`.
    #[must_use]
    pub fn new(runner: R, probe: M) -> Self {
        Self {
            runner,
            probe,
            superuser: None,
            unmount_tool: UnmountTool::detect(),
            retry_interval: UNMOUNT_RETRY_INTERVAL,
        }
    }

    /// Overrides superuser detection.
    #[must_use]
    pub const fn with_superuser(mut self, superuser: bool) -> Self {
        self.superuser = Some(superuser);
        self
    }

    /// Overrides the unmount tool.
    #[must_use]
    pub const fn with_unmount_tool(mut self, tool: Option<UnmountTool>) -> Self {
        self.unmount_tool = tool;
        self
    }

    /// Overrides the pause between unmount attempts.
    #[must_use]
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Unmount tool in use, if any.
    #[must_use]
    pub const fn unmount_tool(&self) -> Option<UnmountTool> {
        self.unmount_tool
    }

    /// Reports whether the mount point currently has entries.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::Unreadable`] when the mount point cannot be
    /// listed.
    pub fn status(&self, mount_path: &Utf8Path) -> Result<bool, MountError> {
        self.probe.is_populated(mount_path)
    }

    fn running_as_superuser(&self) -> Result<bool, MountError> {
        if let Some(superuser) = self.superuser {
            return Ok(superuser);
        }
        let output = self.runner.run("id", &[OsString::from("-u")])?;
        Ok(output.is_success() && output.stdout.trim() == "0")
    }

    /// Attaches the bridge unless the mount point is already populated.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::Superuser`] when running as root,
    /// [`MountError::Unreadable`] when the mount point cannot be sampled, and
    /// [`MountError::Command`] when sshfs exits unsuccessfully.
    pub fn mount(&self, request: &MountRequest) -> Result<MountOutcome, MountError> {
        if self.running_as_superuser()? {
            return Err(MountError::Superuser);
        }
        if self.probe.is_populated(&request.mount_path)? {
            tracing::debug!(mount_path = %request.mount_path, "mount point already populated");
            return Ok(MountOutcome::AlreadyConnected);
        }

        tracing::debug!(
            mount_path = %request.mount_path,
            remote = %request.remote_spec(),
            "attaching sshfs bridge"
        );
        let output = self.runner.run(SSHFS_BIN, &request.sshfs_args())?;
        if !output.is_success() {
            return Err(MountError::Command {
                program: String::from(SSHFS_BIN),
                status_text: output.status_text(),
                stderr: output.stderr,
            });
        }
        Ok(MountOutcome::Connected)
    }

    /// Detaches the bridge, retrying until the mount point empties.
    ///
    /// `on_attempt` is called with the 1-based attempt number before each
    /// detach call.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::NoUnmountTool`] when neither tool is installed,
    /// [`MountError::Unreadable`] when the mount point cannot be sampled, and
    /// [`MountError::Runner`] when the tool cannot be spawned.
    pub async fn unmount(
        &self,
        mount_path: &Utf8Path,
        mut on_attempt: impl FnMut(u32),
    ) -> Result<UnmountOutcome, MountError> {
        let tool = self.unmount_tool.ok_or(MountError::NoUnmountTool)?;
        if !self.probe.is_populated(mount_path)? {
            return Ok(UnmountOutcome::AlreadyDisconnected);
        }

        for attempt in 1..=MAX_UNMOUNT_ATTEMPTS {
            on_attempt(attempt);
            let output = self.runner.run(tool.program(), &tool.args(mount_path))?;
            if !output.is_success() {
                tracing::warn!(
                    %mount_path,
                    attempt,
                    status = %output.status_text(),
                    stderr = %output.stderr.trim(),
                    "unmount attempt failed"
                );
            }
            sleep(self.retry_interval).await;
            if !self.probe.is_populated(mount_path)? {
                return Ok(UnmountOutcome::Disconnected { attempts: attempt });
            }
        }

        Ok(UnmountOutcome::StillMounted {
            attempts: MAX_UNMOUNT_ATTEMPTS,
        })
    }
}
