//! Shared fixtures for mount supervision behavioural tests.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use berth::machine::MachineId;
use berth::mount::{MountRequest, MountSupervisor, UnmountTool};
use berth::resolve::ResolvedParams;
use berth::test_support::{ScriptedRunner, StaticMountProbe};
use camino::Utf8PathBuf;
use rstest::fixture;

pub const MOUNT_PATH: &str = "/mnt/dev";

/// What the supervisor reported, flattened for assertions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Observed {
    Outcome(String),
    Failure(String),
}

#[derive(Clone, Debug)]
pub struct MountContext {
    pub runner: ScriptedRunner,
    pub probe: StaticMountProbe,
    pub superuser: bool,
    pub observed: Option<Observed>,
}

impl MountContext {
    pub fn supervisor(&self) -> MountSupervisor<ScriptedRunner, StaticMountProbe> {
        MountSupervisor::new(self.runner.clone(), self.probe.clone())
            .with_superuser(self.superuser)
            .with_unmount_tool(Some(UnmountTool::Fusermount))
            .with_retry_interval(Duration::from_millis(1))
    }

    pub fn request() -> Option<MountRequest> {
        let params = ResolvedParams {
            machine_id: MachineId::new("i-123")?,
            credential_file: Utf8PathBuf::from("/keys/dev.pem"),
            mount_path: Utf8PathBuf::from(MOUNT_PATH),
            remote_user: String::from("ubuntu"),
            remote_dir: String::from("/var/www/html"),
        };
        Some(MountRequest::new(
            &params,
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 4)),
        ))
    }
}

#[fixture]
pub fn mount_context() -> MountContext {
    MountContext {
        runner: ScriptedRunner::new(),
        probe: StaticMountProbe::always(false),
        superuser: false,
        observed: None,
    }
}
