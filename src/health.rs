//! Remote process checks shown by `list --processes`.

use std::fmt;

use camino::Utf8Path;
use shell_escape::unix::escape;

use crate::machine::{MachineRef, MachineState};
use crate::process::CommandRunner;
use crate::remote::{SSH_BIN, SshTarget};

/// Observed status of one named process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessStatus {
    /// `pgrep` found a match.
    Running,
    /// `pgrep` found nothing, or the probe failed.
    Inactive,
    /// The credential does not belong to the machine.
    Denied,
    /// The machine is not running.
    NotApplicable,
}

impl ProcessStatus {
    /// Table label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Inactive => "Inactive",
            Self::Denied => "Denied",
            Self::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Statuses in the order the process names were requested.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HealthReport {
    entries: Vec<(String, ProcessStatus)>,
}

impl HealthReport {
    fn uniform(names: &[String], status: ProcessStatus) -> Self {
        Self {
            entries: names.iter().map(|name| (name.clone(), status)).collect(),
        }
    }

    /// Report marking every process as denied.
    #[must_use]
    pub fn denied(names: &[String]) -> Self {
        Self::uniform(names, ProcessStatus::Denied)
    }

    /// Status recorded for `name`.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<ProcessStatus> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, status)| *status)
    }

    /// Iterates over `(name, status)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ProcessStatus)> {
        self.entries
            .iter()
            .map(|(name, status)| (name.as_str(), *status))
    }
}

/// Whether `credential_file` is the key recorded for `machine`.
///
/// Matches when the file name contains the key name, ignoring case. A
/// machine with no recorded key never matches.
#[must_use]
pub fn credential_matches(machine: &MachineRef, credential_file: &Utf8Path) -> bool {
    let Some(key_name) = machine.credential_key_name.as_deref() else {
        return false;
    };
    let file_name = credential_file
        .file_name()
        .unwrap_or(credential_file.as_str())
        .to_lowercase();
    file_name.contains(&key_name.to_lowercase())
}

/// Runs `pgrep` over SSH for each requested process.
#[derive(Clone, Debug)]
pub struct ProcessProber<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> ProcessProber<R> {
    /// Creates a prober.
    #[must_use]
    pub const fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Probes `names` on `machine`.
    ///
    /// No remote call is made when the credential does not match or the
    /// machine is not running. A failed probe marks only that process as
    /// inactive.
    pub fn probe(
        &self,
        machine: &MachineRef,
        credential_file: &Utf8Path,
        remote_user: &str,
        names: &[String],
    ) -> HealthReport {
        if !credential_matches(machine, credential_file) {
            return HealthReport::uniform(names, ProcessStatus::Denied);
        }
        let address = match (machine.state, machine.public_address) {
            (MachineState::Running, Some(address)) => address,
            _ => return HealthReport::uniform(names, ProcessStatus::NotApplicable),
        };

        let target = SshTarget::new(address, remote_user, credential_file.to_path_buf());
        let entries = names
            .iter()
            .map(|name| (name.clone(), self.probe_one(&target, &machine.id, name)))
            .collect();
        HealthReport { entries }
    }

    fn probe_one(&self, target: &SshTarget, machine_id: &str, name: &str) -> ProcessStatus {
        let command = format!("pgrep {}", escape(name.into()));
        match self.runner.run(SSH_BIN, &target.command_args(&command)) {
            Ok(output) if output.is_success() => ProcessStatus::Running,
            Ok(output) => {
                tracing::debug!(
                    machine_id,
                    process = name,
                    status = %output.status_text(),
                    "process not running"
                );
                ProcessStatus::Inactive
            }
            Err(err) => {
                tracing::warn!(machine_id, process = name, error = %err, "process probe failed");
                ProcessStatus::Inactive
            }
        }
    }
}
