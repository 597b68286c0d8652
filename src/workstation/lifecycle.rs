//! `start` and `stop`.

use std::io::Write;

use crate::hosts::HostsMode;
use crate::machine::{MachineProvider, MachineState};
use crate::mount::{MountProbe, MountRequest};
use crate::process::CommandRunner;
use crate::remote::wait_for_ssh;
use crate::resolve::SessionCache;

use super::{FatalError, Workstation};

impl<P, R, M, W> Workstation<P, R, M, W>
where
    P: MachineProvider,
    R: CommandRunner + Clone,
    M: MountProbe,
    W: Write,
{
    pub(super) async fn start(&mut self, alias: &str) -> Result<(), FatalError> {
        let machine_id = self.machine_id(alias).await?;
        self.reporter.info(&format!("Starting {machine_id}..."));
        if let Err(err) = self.provider.power_on(&machine_id).await {
            tracing::warn!(machine_id = %machine_id, error = %err, "power on rejected");
            self.reporter
                .error(&format!("Could not start {machine_id}: {err}"));
            return Ok(());
        }

        self.reporter
            .begin_progress("Waiting for the workstation to start up");
        let reporter = &mut self.reporter;
        let outcome = self
            .waiter
            .wait_for(&self.provider, &machine_id, MachineState::Running, |_| {
                reporter.tick();
            })
            .await;
        self.reporter.finish_progress();

        let address = outcome
            .last_seen
            .as_ref()
            .and_then(|machine| machine.public_address);
        if !outcome.reached {
            self.reporter.error(&format!(
                "{machine_id} did not reach {} after {} attempts.",
                MachineState::Running,
                outcome.attempts_used
            ));
            if let Some(known) = address {
                self.reporter.info(&format!("Last known IP: {known}"));
            }
            return Ok(());
        }
        let Some(address) = address else {
            self.reporter
                .error(&format!("{machine_id} is running but has no public address."));
            return Ok(());
        };
        self.reporter.success(&format!("Your IP: {address}"));

        if self.settings.auto.connect_on_start {
            let session = SessionCache {
                machine_id: Some(machine_id.to_string()),
                ..SessionCache::default()
            };
            let params = self.context(&session, alias).resolve_params(machine_id)?;
            if let Some(readiness) = self.ssh_readiness {
                self.reporter.info("Waiting for SSH...");
                let ready =
                    wait_for_ssh(address, readiness.port, readiness.interval, readiness.budget)
                        .await;
                if !ready {
                    self.reporter
                        .error("SSH did not become reachable; trying to connect anyway.");
                }
            }
            self.mount_and_report(&MountRequest::new(&params, address));
        }

        if self.settings.auto.hosts {
            self.update_hosts(address, HostsMode::from_gentle(self.settings.auto.hosts_gentle));
        }
        Ok(())
    }

    pub(super) async fn stop(&mut self, alias: &str) -> Result<(), FatalError> {
        let machine_id = self.machine_id(alias).await?;

        if self.settings.auto.disconnect_on_stop {
            let session = SessionCache::default();
            let mount_path = self.context(&session, alias).mount_path()?;
            self.unmount_and_report(&mount_path).await;
        }

        self.reporter.info(&format!("Stopping {machine_id}..."));
        if let Err(err) = self.provider.power_off(&machine_id).await {
            tracing::warn!(machine_id = %machine_id, error = %err, "power off rejected");
            self.reporter
                .error(&format!("Could not stop {machine_id}: {err}"));
            return Ok(());
        }

        self.reporter.begin_progress("Waiting for the workstation to stop");
        let reporter = &mut self.reporter;
        let outcome = self
            .waiter
            .wait_for(&self.provider, &machine_id, MachineState::Stopped, |_| {
                reporter.tick();
            })
            .await;
        self.reporter.finish_progress();

        if outcome.reached {
            self.reporter.success("Stopped!");
        } else {
            let state = outcome
                .last_seen
                .map_or(MachineState::Unknown, |machine| machine.state);
            self.reporter.error(&format!(
                "{machine_id} did not reach {} after {} attempts (last state: {state}).",
                MachineState::Stopped,
                outcome.attempts_used
            ));
        }
        Ok(())
    }
}
