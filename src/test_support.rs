//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use camino::Utf8Path;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::machine::{MachineId, MachineProvider, MachineRef, MachineState, ProviderFuture};
use crate::mount::{MountError, MountProbe};
use crate::process::{CommandOutput, CommandRunner, RunnerError};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
/// Clones share the same queue and invocation log.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Whether the program was attached to the terminal.
    pub interactive: bool,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Returns the invocations of `program` only.
    #[must_use]
    pub fn invocations_of(&self, program: &str) -> Vec<CommandInvocation> {
        self.invocations
            .borrow()
            .iter()
            .filter(|invocation| invocation.program == program)
            .cloned()
            .collect()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a specific exit code.
    pub fn push_exit_code(&self, code: i32) {
        self.push_output(Some(code), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }

    fn record(&self, program: &str, args: &[OsString], interactive: bool) {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
            interactive,
        });
    }

    fn next_response(&self, program: &str) -> Result<CommandOutput, RunnerError> {
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RunnerError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        self.record(program, args, false);
        self.next_response(program)
    }

    fn run_interactive(
        &self,
        program: &str,
        args: &[OsString],
    ) -> Result<Option<i32>, RunnerError> {
        self.record(program, args, true);
        self.next_response(program).map(|output| output.code)
    }
}

/// Error returned by [`ScriptedProvider`] when a failure is injected.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted provider failure: {0}")]
pub struct ScriptedProviderError(pub String);

#[derive(Debug, Default)]
struct ProviderState {
    machines: BTreeMap<String, MachineRef>,
    scripted_states: BTreeMap<String, VecDeque<MachineState>>,
    fail_list: bool,
    fail_describe: bool,
    fail_power: bool,
    list_calls: usize,
    describe_calls: usize,
    power_on: Vec<String>,
    power_off: Vec<String>,
}

/// In-memory provider whose observed states follow a script.
///
/// Clones share state, so a test can keep a handle while the workstation
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProvider {
    state: Arc<StdMutex<ProviderState>>,
}

impl ScriptedProvider {
    /// Creates a provider with no machines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state sequence that reports `from` until poll `k`, which
    /// reports `to`.
    #[must_use]
    pub fn states_reaching(from: MachineState, to: MachineState, k: u32) -> Vec<MachineState> {
        let before = usize::try_from(k.saturating_sub(1)).unwrap_or_default();
        let mut states = vec![from; before];
        states.push(to);
        states
    }

    fn with_state<T>(&self, apply: impl FnOnce(&mut ProviderState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }

    /// Registers a machine.
    pub fn add_machine(&self, machine: MachineRef) {
        self.with_state(|state| {
            state.machines.insert(machine.id.clone(), machine);
        });
    }

    /// Queues states reported by successive `describe` calls for `id`.
    ///
    /// The final state persists once the queue is drained.
    pub fn script_states(&self, id: &str, states: Vec<MachineState>) {
        self.with_state(|state| {
            state.scripted_states.insert(id.to_owned(), states.into());
        });
    }

    /// Makes `list_machines` fail.
    pub fn fail_list(&self, fail: bool) {
        self.with_state(|state| state.fail_list = fail);
    }

    /// Makes `describe` fail.
    pub fn fail_describe(&self, fail: bool) {
        self.with_state(|state| state.fail_describe = fail);
    }

    /// Makes power actions fail.
    pub fn fail_power(&self, fail: bool) {
        self.with_state(|state| state.fail_power = fail);
    }

    /// Number of `list_machines` calls.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.with_state(|state| state.list_calls)
    }

    /// Number of `describe` calls.
    #[must_use]
    pub fn describe_calls(&self) -> usize {
        self.with_state(|state| state.describe_calls)
    }

    /// Ids passed to `power_on`.
    #[must_use]
    pub fn powered_on(&self) -> Vec<String> {
        self.with_state(|state| state.power_on.clone())
    }

    /// Ids passed to `power_off`.
    #[must_use]
    pub fn powered_off(&self) -> Vec<String> {
        self.with_state(|state| state.power_off.clone())
    }

    fn observe(state: &mut ProviderState, id: &str) -> Option<MachineRef> {
        let mut machine = state.machines.get(id)?.clone();
        if let Some(queue) = state.scripted_states.get_mut(id) {
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().copied()
            };
            if let Some(scripted) = next {
                machine.state = scripted;
                if let Some(stored) = state.machines.get_mut(id) {
                    stored.state = scripted;
                }
            }
        }
        Some(machine)
    }
}

impl MachineProvider for ScriptedProvider {
    type Error = ScriptedProviderError;

    fn list_machines(&self) -> ProviderFuture<'_, Vec<MachineRef>, Self::Error> {
        let result = self.with_state(|state| {
            state.list_calls += 1;
            if state.fail_list {
                return Err(ScriptedProviderError(String::from("list failed")));
            }
            Ok(state.machines.values().cloned().collect())
        });
        Box::pin(async move { result })
    }

    fn describe<'a>(
        &'a self,
        machine_id: &'a MachineId,
    ) -> ProviderFuture<'a, Option<MachineRef>, Self::Error> {
        let result = self.with_state(|state| {
            state.describe_calls += 1;
            if state.fail_describe {
                return Err(ScriptedProviderError(String::from("describe failed")));
            }
            Ok(Self::observe(state, machine_id.as_str()))
        });
        Box::pin(async move { result })
    }

    fn power_on<'a>(&'a self, machine_id: &'a MachineId) -> ProviderFuture<'a, (), Self::Error> {
        let result = self.with_state(|state| {
            state.power_on.push(machine_id.to_string());
            if state.fail_power {
                return Err(ScriptedProviderError(String::from("power on failed")));
            }
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn power_off<'a>(&'a self, machine_id: &'a MachineId) -> ProviderFuture<'a, (), Self::Error> {
        let result = self.with_state(|state| {
            state.power_off.push(machine_id.to_string());
            if state.fail_power {
                return Err(ScriptedProviderError(String::from("power off failed")));
            }
            Ok(())
        });
        Box::pin(async move { result })
    }
}

/// Mount probe that reports a scripted sequence of populated samples.
///
/// The final sample persists once the script is drained.
#[derive(Clone, Debug, Default)]
pub struct StaticMountProbe {
    samples: Rc<RefCell<VecDeque<bool>>>,
    calls: Rc<RefCell<usize>>,
}

impl StaticMountProbe {
    /// Probe that always reports `populated`.
    #[must_use]
    pub fn always(populated: bool) -> Self {
        Self::scripted([populated])
    }

    /// Probe that reports `samples` in order.
    #[must_use]
    pub fn scripted(samples: impl IntoIterator<Item = bool>) -> Self {
        Self {
            samples: Rc::new(RefCell::new(samples.into_iter().collect())),
            calls: Rc::default(),
        }
    }

    /// Number of samples taken.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl MountProbe for StaticMountProbe {
    fn is_populated(&self, _path: &Utf8Path) -> Result<bool, MountError> {
        *self.calls.borrow_mut() += 1;
        let mut samples = self.samples.borrow_mut();
        let sample = if samples.len() > 1 {
            samples.pop_front()
        } else {
            samples.front().copied()
        };
        Ok(sample.unwrap_or(false))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
