//! BDD step definitions for the start and stop workflows.

use berth::machine::MachineState;
use berth::router::{VerbKind, route};
use berth::test_support::{ScriptedProvider, StaticMountProbe};
use berth::workstation::{FatalError, Invocation};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{LifecycleContext, MACHINE_ID};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error("failed to start runtime: {0}")]
    Runtime(String),
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), StepError> {
    if condition {
        Ok(())
    } else {
        Err(StepError::Assertion(message()))
    }
}

#[given("a stopped workstation aliased \"{alias}\"")]
fn stopped_workstation(lifecycle_context: LifecycleContext, alias: String) -> LifecycleContext {
    lifecycle_context.runner.push_success();
    lifecycle_context.with_machine(&alias, MachineState::Stopped)
}

#[given("a running workstation aliased \"{alias}\" with a mounted file system")]
fn running_mounted_workstation(
    mut lifecycle_context: LifecycleContext,
    alias: String,
) -> LifecycleContext {
    lifecycle_context.probe = StaticMountProbe::scripted([true, false]);
    lifecycle_context.runner.push_success();
    lifecycle_context.with_machine(&alias, MachineState::Running)
}

#[given("the workstation reports running after \"{polls}\" polls")]
fn reports_running(lifecycle_context: LifecycleContext, polls: u32) -> LifecycleContext {
    lifecycle_context.provider.script_states(
        MACHINE_ID,
        ScriptedProvider::states_reaching(MachineState::Pending, MachineState::Running, polls),
    );
    lifecycle_context
}

#[given("the workstation reports stopped after \"{polls}\" polls")]
fn reports_stopped(lifecycle_context: LifecycleContext, polls: u32) -> LifecycleContext {
    lifecycle_context.provider.script_states(
        MACHINE_ID,
        ScriptedProvider::states_reaching(MachineState::Stopping, MachineState::Stopped, polls),
    );
    lifecycle_context
}

#[given("the workstation never leaves pending")]
fn never_leaves_pending(lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context
        .provider
        .script_states(MACHINE_ID, vec![MachineState::Pending]);
    lifecycle_context
}

#[given("the waiter allows \"{attempts}\" attempts")]
fn waiter_allows(mut lifecycle_context: LifecycleContext, attempts: u32) -> LifecycleContext {
    lifecycle_context.max_attempts = attempts;
    lifecycle_context
}

#[when("I run \"{verb}\" against \"{target}\"")]
fn run_verb(
    mut lifecycle_context: LifecycleContext,
    verb: String,
    target: String,
) -> Result<LifecycleContext, StepError> {
    let routed = match route(&verb) {
        Ok(found) => match found.verb.kind() {
            VerbKind::Machine(machine_verb) => machine_verb,
            VerbKind::Local(local_verb) => {
                return Err(StepError::Assertion(format!(
                    "{local_verb:?} runs without a workstation"
                )));
            }
        },
        Err(err) => {
            lifecycle_context.outcome = Some(Err(FatalError::from(err).to_string()));
            return Ok(lifecycle_context);
        }
    };

    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    let mut workstation = lifecycle_context.workstation();
    let invocation = Invocation::new(routed, Some(target));
    let result = runtime.block_on(workstation.dispatch(&invocation));

    lifecycle_context.outcome = Some(result.map_err(|err| err.to_string()));
    lifecycle_context.output = String::from_utf8_lossy(&workstation.into_output()).into_owned();
    Ok(lifecycle_context)
}

#[then("the command succeeds")]
fn command_succeeds(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match &lifecycle_context.outcome {
        Some(Ok(())) => Ok(()),
        Some(Err(message)) => Err(StepError::Assertion(format!(
            "expected success, got fatal error: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the command fails with \"{snippet}\"")]
fn command_fails(lifecycle_context: &LifecycleContext, snippet: String) -> Result<(), StepError> {
    let Some(Err(message)) = &lifecycle_context.outcome else {
        return Err(StepError::Assertion(String::from(
            "expected a fatal error",
        )));
    };
    ensure(message.contains(&snippet), || {
        format!("expected error containing '{snippet}', got '{message}'")
    })
}

#[then("the provider was polled \"{count}\" times")]
fn provider_polled(lifecycle_context: &LifecycleContext, count: usize) -> Result<(), StepError> {
    let polls = lifecycle_context.provider.describe_calls();
    ensure(polls == count, || format!("expected {count} polls, got {polls}"))
}

#[then("sshfs was invoked \"{count}\" times")]
fn sshfs_invoked(lifecycle_context: &LifecycleContext, count: usize) -> Result<(), StepError> {
    let calls = lifecycle_context.runner.invocations_of("sshfs").len();
    ensure(calls == count, || format!("expected {count} sshfs calls, got {calls}"))
}

#[then("the output contains \"{snippet}\"")]
fn output_contains(lifecycle_context: &LifecycleContext, snippet: String) -> Result<(), StepError> {
    let output = &lifecycle_context.output;
    ensure(output.contains(&snippet), || {
        format!("expected output containing '{snippet}', got:\n{output}")
    })
}

#[then("the machine was powered on")]
fn machine_powered_on(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let powered = lifecycle_context.provider.powered_on();
    ensure(powered == [MACHINE_ID], || {
        format!("expected power on for {MACHINE_ID}, got {powered:?}")
    })
}

#[then("the machine was powered off")]
fn machine_powered_off(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let powered = lifecycle_context.provider.powered_off();
    ensure(powered == [MACHINE_ID], || {
        format!("expected power off for {MACHINE_ID}, got {powered:?}")
    })
}

#[then("the file system was unmounted")]
fn file_system_unmounted(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let calls = lifecycle_context.runner.invocations_of("fusermount");
    ensure(calls.len() == 1, || {
        format!("expected one fusermount call, got {calls:?}")
    })
}

#[then("no power action was requested")]
fn no_power_action(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let on = lifecycle_context.provider.powered_on();
    let off = lifecycle_context.provider.powered_off();
    ensure(on.is_empty() && off.is_empty(), || {
        format!("expected no power actions, got on={on:?} off={off:?}")
    })
}
