//! `terminal`, `ip`, `ip-clean`, and `hosts`.

use std::io::Write;
use std::net::IpAddr;

use crate::hosts::{HostsEditor, HostsMode, HostsOutcome};
use crate::machine::MachineProvider;
use crate::mount::MountProbe;
use crate::process::CommandRunner;
use crate::remote::{SSH_BIN, SshTarget};
use crate::resolve::SessionCache;

use super::{FatalError, Workstation};

impl<P, R, M, W> Workstation<P, R, M, W>
where
    P: MachineProvider,
    R: CommandRunner + Clone,
    M: MountProbe,
    W: Write,
{
    pub(super) async fn terminal(&mut self, alias: &str) -> Result<(), FatalError> {
        let machine_id = self.machine_id(alias).await?;
        let session = SessionCache::default();
        let ctx = self.context(&session, alias);
        let credential_file = ctx.credential_file()?;
        let remote_user = ctx.remote_user();
        let Some(address) = self.public_address(&machine_id).await? else {
            return Ok(());
        };

        self.reporter.info(&format!("Connecting to {address}..."));
        let target = SshTarget::new(address, remote_user, credential_file);
        match self.runner.run_interactive(SSH_BIN, &target.terminal_args()) {
            Ok(Some(0)) => {}
            Ok(code) => {
                tracing::debug!(machine_id = %machine_id, ?code, "remote shell exited");
            }
            Err(err) => self.reporter.error(&format!("Could not open a shell: {err}")),
        }
        Ok(())
    }

    pub(super) async fn print_ip(&mut self, alias: &str, clean: bool) -> Result<(), FatalError> {
        let machine_id = self.machine_id(alias).await?;
        let Some(address) = self.public_address(&machine_id).await? else {
            return Ok(());
        };
        if clean {
            self.reporter.plain(&address.to_string());
        } else {
            self.reporter.success(&format!("Your IP: {address}"));
        }
        Ok(())
    }

    pub(super) async fn hosts(&mut self, alias: &str) -> Result<(), FatalError> {
        let machine_id = self.machine_id(alias).await?;
        let Some(address) = self.public_address(&machine_id).await? else {
            return Ok(());
        };
        self.update_hosts(address, HostsMode::from_gentle(self.settings.auto.hosts_gentle));
        Ok(())
    }

    pub(super) fn update_hosts(&mut self, address: IpAddr, mode: HostsMode) {
        let Some(domain) = self.settings.hosts.domain.clone() else {
            self.reporter
                .error("No hosts domain configured; set [hosts] domain in berth.toml.");
            return;
        };
        let editor = HostsEditor::new(
            self.settings.hosts.file.as_str(),
            self.settings.hosts.platform,
        );
        match editor.apply(&domain, address, mode) {
            Ok(HostsOutcome::Updated { path }) => {
                self.reporter
                    .success(&format!("Hosts file {path} updated successfully."));
            }
            Ok(HostsOutcome::Unchanged) => {
                self.reporter
                    .info(&format!("{domain} already points at {address}."));
            }
            Ok(HostsOutcome::NoEntry) => self.reporter.error(&format!(
                "No entry for {domain} in the hosts file; gentle mode leaves it untouched."
            )),
            Ok(HostsOutcome::PlatformUnsupported { platform }) => self.reporter.error(&format!(
                "Hosts editing is limited to the '{platform}' platform."
            )),
            Err(err) => {
                tracing::warn!(error = %err, "hosts update failed");
                self.reporter.error(&format!("Failed to update hosts: {err}"));
            }
        }
    }
}
