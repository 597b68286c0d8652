//! `list`.

use std::io::Write;

use crate::health::{HealthReport, ProcessStatus};
use crate::machine::{MachineProvider, MachineRef};
use crate::mount::MountProbe;
use crate::process::CommandRunner;
use crate::resolve::{DEFAULT_ALIAS, Overrides, ResolutionContext, SessionCache};

use super::{FatalError, Workstation, render_table};

const BASE_HEADERS: [&str; 5] = ["ID", "Name", "Alias", "IP", "State"];

impl<P, R, M, W> Workstation<P, R, M, W>
where
    P: MachineProvider,
    R: CommandRunner + Clone,
    M: MountProbe,
    W: Write,
{
    pub(super) async fn list(&mut self, show_processes: bool) -> Result<(), FatalError> {
        let machines = match self.provider.list_machines().await {
            Ok(machines) => machines,
            Err(err) => {
                tracing::warn!(error = %err, "listing machines failed");
                self.reporter
                    .error(&format!("Could not list machines: {err}"));
                return Ok(());
            }
        };
        if machines.is_empty() {
            return Err(FatalError::NoMachines);
        }

        let total = machines.len();
        self.reporter
            .begin_progress(&format!("Please wait... [{total} machines]"));
        let mut rows = Vec::with_capacity(total);
        for mut machine in machines {
            machine.alias = self.settings.alias_for(&machine.id).map(str::to_owned);
            let health = show_processes.then(|| self.probe_machine(&machine));
            rows.push(row(&machine, health.as_ref(), &self.settings.health.processes));
            self.reporter.tick();
        }
        self.reporter.finish_progress();

        let mut headers: Vec<&str> = BASE_HEADERS.to_vec();
        if show_processes {
            headers.extend(self.settings.health.processes.iter().map(String::as_str));
        }
        for line in render_table(&headers, &rows) {
            self.reporter.plain(&line);
        }
        Ok(())
    }

    fn probe_machine(&self, machine: &MachineRef) -> HealthReport {
        let alias = machine.alias.as_deref().unwrap_or(DEFAULT_ALIAS);
        let overrides = Overrides {
            machine_id: Some(machine.id.clone()),
            ..self.overrides.clone()
        };
        let session = SessionCache::default();
        let ctx = ResolutionContext::new(&overrides, &session, &self.settings, alias);
        let names = &self.settings.health.processes;
        match ctx.credential_file() {
            Ok(credential_file) => {
                self.prober
                    .probe(machine, &credential_file, &ctx.remote_user(), names)
            }
            Err(err) => {
                tracing::warn!(machine_id = %machine.id, error = %err, "no credential for probe");
                HealthReport::denied(names)
            }
        }
    }
}

fn row(machine: &MachineRef, health: Option<&HealthReport>, names: &[String]) -> Vec<String> {
    let mut cells = vec![
        machine.id.clone(),
        machine.name.clone().unwrap_or_default(),
        machine.alias.clone().unwrap_or_default(),
        machine
            .public_address
            .map(|address| address.to_string())
            .unwrap_or_default(),
        machine.state.to_string(),
    ];
    if let Some(report) = health {
        cells.extend(names.iter().map(|name| {
            report
                .status(name)
                .unwrap_or(ProcessStatus::NotApplicable)
                .to_string()
        }));
    }
    cells
}
