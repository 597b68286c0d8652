//! `cfs`, `dfs`, and `rfs`.

use std::io::Write;

use camino::Utf8Path;

use crate::machine::MachineProvider;
use crate::mount::{MountError, MountOutcome, MountProbe, MountRequest, UnmountOutcome};
use crate::process::CommandRunner;
use crate::resolve::{ResolvedParams, SessionCache};

use super::{FatalError, Workstation};

impl<P, R, M, W> Workstation<P, R, M, W>
where
    P: MachineProvider,
    R: CommandRunner + Clone,
    M: MountProbe,
    W: Write,
{
    async fn bridge_params(&mut self, alias: &str) -> Result<Option<MountRequest>, FatalError> {
        let machine_id = self.machine_id(alias).await?;
        let session = SessionCache {
            machine_id: Some(machine_id.to_string()),
            ..SessionCache::default()
        };
        let params: ResolvedParams = self
            .context(&session, alias)
            .resolve_params(machine_id.clone())?;
        let Some(address) = self.public_address(&machine_id).await? else {
            return Ok(None);
        };
        Ok(Some(MountRequest::new(&params, address)))
    }

    pub(super) async fn connect(&mut self, alias: &str) -> Result<(), FatalError> {
        if let Some(request) = self.bridge_params(alias).await? {
            self.mount_and_report(&request);
        }
        Ok(())
    }

    pub(super) async fn disconnect(&mut self, alias: &str) -> Result<(), FatalError> {
        let session = SessionCache::default();
        let mount_path = self.context(&session, alias).mount_path()?;
        self.unmount_and_report(&mount_path).await;
        Ok(())
    }

    /// Detaches before the machine address is looked up.
    pub(super) async fn reconnect(&mut self, alias: &str) -> Result<(), FatalError> {
        self.disconnect(alias).await?;
        self.connect(alias).await
    }

    pub(super) fn mount_and_report(&mut self, request: &MountRequest) {
        self.reporter.info("Connecting file system...");
        match self.mounts.mount(request) {
            Ok(MountOutcome::Connected) => self.reporter.success(&format!(
                "Filesystem '{}' connected to '{}'.",
                request.remote_dir, request.mount_path
            )),
            Ok(MountOutcome::AlreadyConnected) => self.reporter.error(
                "Mount point is not empty, this means you've probably already connected with sshfs.",
            ),
            Err(err) => self.report_mount_error(&err),
        }
    }

    pub(super) async fn unmount_and_report(&mut self, mount_path: &Utf8Path) {
        self.reporter.begin_progress("Disconnecting file system");
        let reporter = &mut self.reporter;
        let result = self
            .mounts
            .unmount(mount_path, |_| {
                reporter.tick();
            })
            .await;
        self.reporter.finish_progress();

        match result {
            Ok(UnmountOutcome::Disconnected { attempts }) => {
                tracing::debug!(%mount_path, attempts, "unmounted");
                self.reporter.success("Filesystem disconnected.");
            }
            Ok(UnmountOutcome::AlreadyDisconnected) => {
                self.reporter.error("Filesystem is already disconnected.");
            }
            Ok(UnmountOutcome::StillMounted { attempts }) => {
                tracing::warn!(%mount_path, attempts, "mount point still populated");
                self.reporter.error("Couldn't disconnect file system!");
            }
            Err(err) => self.report_mount_error(&err),
        }
    }

    fn report_mount_error(&mut self, err: &MountError) {
        tracing::warn!(error = %err, "file system operation failed");
        let message = match err {
            MountError::Unreadable { .. } => {
                String::from("Error: Could not read from file system!")
            }
            other => format!("Error: {other}"),
        };
        self.reporter.error(&message);
    }
}
