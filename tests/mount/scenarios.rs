//! BDD scenarios for the mount supervisor.

use rstest_bdd_macros::scenario;

use super::test_helpers::{MountContext, mount_context};

#[scenario(
    path = "tests/features/mount.feature",
    name = "Mount connects an empty mount point"
)]
fn scenario_mount_connects(mount_context: MountContext) {
    drop(mount_context);
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "Mount leaves a populated mount point alone"
)]
fn scenario_mount_already_connected(mount_context: MountContext) {
    drop(mount_context);
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "Mount refuses to run as the superuser"
)]
fn scenario_mount_superuser(mount_context: MountContext) {
    drop(mount_context);
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "Unmount stops once the mount point empties"
)]
fn scenario_unmount_empties(mount_context: MountContext) {
    drop(mount_context);
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "Unmount gives up after ten attempts"
)]
fn scenario_unmount_gives_up(mount_context: MountContext) {
    drop(mount_context);
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "Unmount of an empty mount point does nothing"
)]
fn scenario_unmount_noop(mount_context: MountContext) {
    drop(mount_context);
}
