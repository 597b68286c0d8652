//! Typed shape of the `berth.toml` document.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::hosts::HostsPlatform;

/// Key looked up in a named credential table when no alias-specific entry
/// applies.
pub const DEFAULT_CREDENTIAL_KEY: &str = "default";

/// Hosts file edited when the document does not name one.
pub const DEFAULT_HOSTS_FILE: &str = "/etc/hosts";

/// Settings loaded once per invocation and treated as read-only.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Local directory the remote file system is bridged onto.
    pub mount_path: Option<String>,
    /// Login used for SSH and sshfs.
    pub remote_user: Option<String>,
    /// Remote directory exposed at the mount point.
    pub remote_dir: Option<String>,
    /// Private key path, or a table of named key paths.
    pub credential_files: Option<CredentialFiles>,
    /// Machines addressable by alias.
    pub machines: BTreeMap<String, MachineAlias>,
    /// Automatic follow-up actions.
    pub auto: AutoSettings,
    /// Hosts-file integration.
    pub hosts: HostsSettings,
    /// Processes probed by `list`.
    pub health: HealthSettings,
}

impl Settings {
    /// Looks up the alias entry for `alias`.
    #[must_use]
    pub fn machine(&self, alias: &str) -> Option<&MachineAlias> {
        self.machines.get(alias)
    }

    /// Finds the alias under which `machine_id` is recorded.
    #[must_use]
    pub fn alias_for(&self, machine_id: &str) -> Option<&str> {
        self.machines
            .iter()
            .find(|(_, entry)| entry.id.trim() == machine_id)
            .map(|(alias, _)| alias.as_str())
    }
}

/// Credential configuration: one path, or a table of named paths.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum CredentialFiles {
    /// A single key used for every machine.
    Single(String),
    /// Named keys; the `default` entry is the fallback.
    Named(BTreeMap<String, String>),
}

/// One `[machines.<alias>]` entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct MachineAlias {
    /// Provider machine identifier.
    pub id: String,
    /// Name of the entry in `credential_files` to use for this machine.
    #[serde(default)]
    pub credential_file: Option<String>,
}

/// The `[auto]` table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct AutoSettings {
    /// Mount the remote file system after `start`.
    pub connect_on_start: bool,
    /// Unmount before `stop`.
    pub disconnect_on_stop: bool,
    /// Update the hosts file after `start`.
    pub hosts: bool,
    /// Leave the hosts file untouched when the domain has no entry.
    pub hosts_gentle: bool,
}

impl Default for AutoSettings {
    fn default() -> Self {
        Self {
            connect_on_start: true,
            disconnect_on_stop: true,
            hosts: false,
            hosts_gentle: true,
        }
    }
}

/// The `[hosts]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct HostsSettings {
    /// Domain whose entry points at the machine.
    pub domain: Option<String>,
    /// Hosts file path.
    pub file: String,
    /// Platform policy governing whether edits are attempted.
    pub platform: HostsPlatform,
}

impl Default for HostsSettings {
    fn default() -> Self {
        Self {
            domain: None,
            file: String::from(DEFAULT_HOSTS_FILE),
            platform: HostsPlatform::default(),
        }
    }
}

/// The `[health]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct HealthSettings {
    /// Process names probed with `pgrep`.
    pub processes: Vec<String>,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            processes: vec![String::from("mysqld"), String::from("apache")],
        }
    }
}
