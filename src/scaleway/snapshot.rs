//! Conversion from Scaleway server records into provider-neutral snapshots.

use std::net::IpAddr;
use std::str::FromStr;

use crate::machine::{MachineRef, MachineState};

/// Tag prefix naming the credential allowed to access a server.
pub const CREDENTIAL_TAG_PREFIX: &str = "berth-key=";

pub(super) const POWER_ON: &str = "poweron";
pub(super) const POWER_OFF: &str = "poweroff";

/// The fields of a Scaleway server the provider cares about.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct InstanceSnapshot {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) state: String,
    pub(super) allowed_actions: Vec<String>,
    pub(super) public_ip: Option<String>,
    pub(super) tags: Vec<String>,
}

impl From<scaleway_rs::ScalewayInstance> for InstanceSnapshot {
    fn from(server: scaleway_rs::ScalewayInstance) -> Self {
        Self {
            id: server.id,
            name: server.name,
            state: server.state,
            allowed_actions: server.allowed_actions,
            public_ip: server.public_ip.map(|ip| ip.address),
            tags: server.tags,
        }
    }
}

impl InstanceSnapshot {
    pub(super) fn allows(&self, action: &str) -> bool {
        self.allowed_actions.iter().any(|allowed| allowed == action)
    }

    pub(super) fn machine_state(&self) -> MachineState {
        map_state(&self.state)
    }

    pub(super) fn into_machine_ref(self) -> MachineRef {
        let state = self.machine_state();
        let mut machine = MachineRef::new(self.id, state);
        if !self.name.trim().is_empty() {
            machine = machine.with_name(self.name);
        }
        if let Some(address) = self
            .public_ip
            .as_deref()
            .and_then(|ip| IpAddr::from_str(ip).ok())
        {
            machine = machine.with_public_address(address);
        }
        if let Some(key_name) = credential_tag(&self.tags) {
            machine = machine.with_credential_key_name(key_name);
        }
        machine
    }
}

/// Maps a Scaleway server state string onto [`MachineState`].
#[must_use]
pub fn map_state(state: &str) -> MachineState {
    match state {
        "running" => MachineState::Running,
        "starting" => MachineState::Pending,
        "stopping" => MachineState::Stopping,
        "stopped" | "stopped in place" => MachineState::Stopped,
        _ => MachineState::Unknown,
    }
}

/// Extracts the credential key name from a server's tags.
#[must_use]
pub fn credential_tag(tags: &[String]) -> Option<&str> {
    tags.iter()
        .find_map(|tag| tag.strip_prefix(CREDENTIAL_TAG_PREFIX))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
