//! Shared fixtures for lifecycle behavioural tests.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use berth::config_store::{CredentialFiles, MachineAlias, Settings};
use berth::machine::{MachineRef, MachineState};
use berth::mount::{MountSupervisor, UnmountTool};
use berth::resolve::Overrides;
use berth::test_support::{ScriptedProvider, ScriptedRunner, StaticMountProbe};
use berth::waiter::StateWaiter;
use berth::workstation::Workstation;
use rstest::fixture;

pub const MACHINE_ID: &str = "i-123";
pub const ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
const CREDENTIAL_FILE: &str = "/keys/dev-box.pem";
const MOUNT_PATH: &str = "/mnt/dev";
const DEFAULT_ATTEMPTS: u32 = 60;

pub type TestWorkstation =
    Workstation<ScriptedProvider, ScriptedRunner, StaticMountProbe, Vec<u8>>;

#[derive(Clone, Debug)]
pub struct LifecycleContext {
    pub provider: ScriptedProvider,
    pub runner: ScriptedRunner,
    pub probe: StaticMountProbe,
    pub settings: Settings,
    pub max_attempts: u32,
    pub outcome: Option<Result<(), String>>,
    pub output: String,
}

impl LifecycleContext {
    /// Registers the machine under `alias` in the given state.
    pub fn with_machine(mut self, alias: &str, state: MachineState) -> Self {
        self.provider.add_machine(
            MachineRef::new(MACHINE_ID, state)
                .with_public_address(ADDRESS)
                .with_name("dev-box")
                .with_credential_key_name("dev-box"),
        );
        self.settings.machines.insert(
            alias.to_owned(),
            MachineAlias {
                id: String::from(MACHINE_ID),
                credential_file: None,
            },
        );
        self
    }

    pub fn workstation(&self) -> TestWorkstation {
        let mounts = MountSupervisor::new(self.runner.clone(), self.probe.clone())
            .with_superuser(false)
            .with_unmount_tool(Some(UnmountTool::Fusermount))
            .with_retry_interval(Duration::from_millis(1));
        let waiter = StateWaiter::default()
            .with_poll_interval(Duration::from_millis(1))
            .with_max_attempts(self.max_attempts);
        Workstation::new(
            self.provider.clone(),
            self.runner.clone(),
            mounts,
            self.settings.clone(),
            Overrides::default(),
            Vec::new(),
        )
        .with_waiter(waiter)
        .with_ssh_readiness(None)
    }
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    let settings = Settings {
        mount_path: Some(String::from(MOUNT_PATH)),
        credential_files: Some(CredentialFiles::Single(String::from(CREDENTIAL_FILE))),
        ..Settings::default()
    };
    LifecycleContext {
        provider: ScriptedProvider::new(),
        runner: ScriptedRunner::new(),
        probe: StaticMountProbe::always(false),
        settings,
        max_attempts: DEFAULT_ATTEMPTS,
        outcome: None,
        output: String::new(),
    }
}
