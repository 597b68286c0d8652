//! BDD step definitions for the mount supervisor.

use berth::mount::{MAX_UNMOUNT_ATTEMPTS, MountOutcome, UnmountOutcome};
use berth::test_support::StaticMountProbe;
use camino::Utf8Path;
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{MOUNT_PATH, MountContext, Observed};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error("failed to start runtime: {0}")]
    Runtime(String),
}

fn describe_mount(outcome: MountOutcome) -> String {
    match outcome {
        MountOutcome::Connected => String::from("connected"),
        MountOutcome::AlreadyConnected => String::from("already connected"),
    }
}

fn describe_unmount(outcome: UnmountOutcome) -> String {
    match outcome {
        UnmountOutcome::Disconnected { attempts } => {
            format!("disconnected after {attempts} attempts")
        }
        UnmountOutcome::AlreadyDisconnected => String::from("already disconnected"),
        UnmountOutcome::StillMounted { attempts } => {
            format!("still mounted after {attempts} attempts")
        }
    }
}

#[given("an empty mount point")]
fn empty_mount_point(mut mount_context: MountContext) -> MountContext {
    mount_context.probe = StaticMountProbe::always(false);
    mount_context.runner.push_success();
    mount_context
}

#[given("a populated mount point")]
fn populated_mount_point(mut mount_context: MountContext) -> MountContext {
    mount_context.probe = StaticMountProbe::always(true);
    mount_context
}

#[given("the operator is the superuser")]
fn operator_is_superuser(mut mount_context: MountContext) -> MountContext {
    mount_context.superuser = true;
    mount_context
}

#[given("a mount point that empties after \"{attempts}\" unmount attempts")]
fn empties_after(mut mount_context: MountContext, attempts: usize) -> MountContext {
    let mut samples = vec![true; attempts];
    samples.push(false);
    mount_context.probe = StaticMountProbe::scripted(samples);
    for _ in 0..attempts {
        mount_context.runner.push_success();
    }
    mount_context
}

#[given("a mount point that never empties")]
fn never_empties(mut mount_context: MountContext) -> MountContext {
    mount_context.probe = StaticMountProbe::always(true);
    for _ in 0..MAX_UNMOUNT_ATTEMPTS {
        mount_context.runner.push_failure(1);
    }
    mount_context
}

#[when("I connect the file system")]
fn connect(mut mount_context: MountContext) -> Result<MountContext, StepError> {
    let request = MountContext::request()
        .ok_or_else(|| StepError::Assertion(String::from("invalid mount request")))?;
    let observed = match mount_context.supervisor().mount(&request) {
        Ok(outcome) => Observed::Outcome(describe_mount(outcome)),
        Err(err) => Observed::Failure(err.to_string()),
    };
    mount_context.observed = Some(observed);
    Ok(mount_context)
}

#[when("I disconnect the file system")]
fn disconnect(mut mount_context: MountContext) -> Result<MountContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    let supervisor = mount_context.supervisor();
    let result = runtime.block_on(supervisor.unmount(Utf8Path::new(MOUNT_PATH), |_| {}));
    let observed = match result {
        Ok(outcome) => Observed::Outcome(describe_unmount(outcome)),
        Err(err) => Observed::Failure(err.to_string()),
    };
    mount_context.observed = Some(observed);
    Ok(mount_context)
}

#[then("the mount outcome is \"{expected}\"")]
fn mount_outcome(mount_context: &MountContext, expected: String) -> Result<(), StepError> {
    outcome_matches(mount_context, &expected)
}

#[then("the unmount outcome is \"{expected}\"")]
fn unmount_outcome(mount_context: &MountContext, expected: String) -> Result<(), StepError> {
    outcome_matches(mount_context, &expected)
}

fn outcome_matches(mount_context: &MountContext, expected: &str) -> Result<(), StepError> {
    match &mount_context.observed {
        Some(Observed::Outcome(actual)) if actual == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected outcome '{expected}', got {other:?}"
        ))),
    }
}

#[then("the mount fails with \"{snippet}\"")]
fn mount_fails(mount_context: &MountContext, snippet: String) -> Result<(), StepError> {
    match &mount_context.observed {
        Some(Observed::Failure(message)) if message.contains(&snippet) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure containing '{snippet}', got {other:?}"
        ))),
    }
}

#[then("sshfs was invoked with \"{option}\"")]
fn sshfs_invoked_with(mount_context: &MountContext, option: String) -> Result<(), StepError> {
    let calls = mount_context.runner.invocations_of("sshfs");
    let [call] = calls.as_slice() else {
        return Err(StepError::Assertion(format!(
            "expected exactly one sshfs call, got {calls:?}"
        )));
    };
    let command = call.command_string();
    let expected_prefix = "sshfs ubuntu@198.51.100.4:/var/www/html /mnt/dev -o ";
    if command.starts_with(expected_prefix) && command.contains(&option) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected sshfs command: {command}"
        )))
    }
}

#[then("no command was run")]
fn no_command_run(mount_context: &MountContext) -> Result<(), StepError> {
    let calls = mount_context.runner.invocations();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("expected no commands, got {calls:?}")))
    }
}

#[then("the unmount tool was invoked \"{count}\" times")]
fn unmount_tool_invoked(mount_context: &MountContext, count: usize) -> Result<(), StepError> {
    let calls = mount_context.runner.invocations_of("fusermount").len();
    if calls == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} fusermount calls, got {calls}"
        )))
    }
}
