//! BDD scenarios for the start and stop workflows.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Start waits for the machine and mounts the file system"
)]
fn scenario_start_mounts(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Start gives up after the attempt budget"
)]
fn scenario_start_times_out(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Start accepts a literal machine id"
)]
fn scenario_start_literal_id(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Stop disconnects the file system and waits for the machine"
)]
fn scenario_stop_unmounts(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "An unknown target is fatal"
)]
fn scenario_unknown_target(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "An unknown command is fatal"
)]
fn scenario_unknown_command(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}
