//! Command-line interface definitions for the `berth` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `berth` binary.
///
/// The command word is routed by the binary rather than by clap so that
/// aliases such as `mount` for `cfs` and the unknown-command message stay in
/// one routing table.
#[derive(Debug, Parser)]
#[command(
    name = "berth",
    about = "Start, stop, and mount a remote development workstation",
    after_help = "Run `berth usage` for the list of commands."
)]
pub(crate) struct Cli {
    /// Command to run, for example `start`, `cfs`, or `list`.
    #[arg(value_name = "COMMAND")]
    pub(crate) command: Option<String>,
    /// Machine alias from berth.toml, or a literal machine id.
    #[arg(value_name = "TARGET")]
    pub(crate) target: Option<String>,
    /// Probe configured processes on each machine when listing.
    #[arg(short = 'p', long)]
    pub(crate) processes: bool,
    /// Use this machine id regardless of the target alias.
    #[arg(long, value_name = "ID")]
    pub(crate) machine_id: Option<String>,
    /// Private key used for SSH and sshfs.
    #[arg(long, value_name = "PATH", env = "BERTH_CREDENTIAL_FILE")]
    pub(crate) credential_file: Option<String>,
    /// Local directory where the remote file system is mounted.
    #[arg(long, value_name = "PATH", env = "BERTH_MOUNT_PATH")]
    pub(crate) mount_path: Option<String>,
    /// Login used on the workstation.
    #[arg(long, value_name = "USER")]
    pub(crate) remote_user: Option<String>,
    /// Remote directory exposed at the mount point.
    #[arg(long, value_name = "DIR")]
    pub(crate) remote_dir: Option<String>,
    /// Overwrite an existing settings file during `setup`.
    #[arg(long)]
    pub(crate) force: bool,
}
