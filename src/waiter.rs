//! Bounded polling until a machine reaches a target power state.

use std::time::Duration;

use tokio::time::sleep;

use crate::machine::{MachineId, MachineProvider, MachineRef, MachineState};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Poll cadence and attempt budget.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitPolicy {
    /// Pause between consecutive polls.
    pub poll_interval: Duration,
    /// Maximum number of polls.
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Result of a wait.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WaitOutcome {
    /// Whether the target state was observed.
    pub reached: bool,
    /// Number of polls issued.
    pub attempts_used: u32,
    /// Most recent successful observation, if any.
    pub last_seen: Option<MachineRef>,
}

/// Polls a provider at a fixed interval.
#[derive(Clone, Copy, Debug, Default)]
pub struct StateWaiter {
    policy: WaitPolicy,
}

impl StateWaiter {
    /// Creates a waiter with the given policy.
    #[must_use]
    pub const fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    /// Overrides the poll interval, primarily for tests.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.policy.poll_interval = interval;
        self
    }

    /// Overrides the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Polls `machine_id` until it reports `target` or the budget runs out.
    ///
    /// `on_attempt` is called once per poll with the 1-based attempt number,
    /// whether or not the poll succeeds. Provider failures and missing
    /// machines count as attempts observing [`MachineState::Unknown`].
    pub async fn wait_for<P: MachineProvider>(
        &self,
        provider: &P,
        machine_id: &MachineId,
        target: MachineState,
        mut on_attempt: impl FnMut(u32),
    ) -> WaitOutcome {
        let mut last_seen = None;
        for attempt in 1..=self.policy.max_attempts {
            on_attempt(attempt);
            let observed = match provider.describe(machine_id).await {
                Ok(Some(machine)) => {
                    let state = machine.state;
                    last_seen = Some(machine);
                    state
                }
                Ok(None) => MachineState::Unknown,
                Err(err) => {
                    tracing::warn!(
                        machine_id = %machine_id,
                        attempt,
                        error = %err,
                        "state poll failed"
                    );
                    MachineState::Unknown
                }
            };
            tracing::debug!(machine_id = %machine_id, attempt, state = %observed, "polled state");

            if observed == target {
                return WaitOutcome {
                    reached: true,
                    attempts_used: attempt,
                    last_seen,
                };
            }
            if attempt < self.policy.max_attempts {
                sleep(self.policy.poll_interval).await;
            }
        }

        WaitOutcome {
            reached: false,
            attempts_used: self.policy.max_attempts,
            last_seen,
        }
    }
}
