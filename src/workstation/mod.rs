//! Handlers that compose resolution, waiting, bridging, and probing.
//!
//! A [`Workstation`] owns every collaborator for one invocation. Handlers
//! return `Err` only for fatal conditions; everything recoverable is reported
//! through the [`Reporter`] and the handler returns `Ok(())`.

use std::io::Write;
use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::config_store::{ConfigStoreError, Settings};
use crate::health::ProcessProber;
use crate::machine::{MachineId, MachineProvider, MachineRef};
use crate::mount::{MountProbe, MountSupervisor};
use crate::process::CommandRunner;
use crate::remote::DEFAULT_SSH_PORT;
use crate::report::Reporter;
use crate::resolve::{DEFAULT_ALIAS, Overrides, ResolutionContext, ResolveError, SessionCache};
use crate::router::{MachineVerb, RouteError};
use crate::waiter::StateWaiter;

mod access;
mod filesystem;
mod inventory;
mod lifecycle;
pub mod local;
mod table;

pub use table::{render_rows, render_table};

/// Conditions that end the invocation with a single error line.
#[derive(Debug, Error)]
pub enum FatalError {
    /// A required parameter could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The verb is not in the routing table.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// The provider does not know the machine.
    #[error("No instances available matching '{machine_id}'.")]
    MissingMachine {
        /// Machine that could not be found.
        machine_id: String,
    },
    /// The provider lists no machines at all.
    #[error("No instances available.")]
    NoMachines,
    /// A provider call needed for resolution failed.
    #[error("provider request failed: {message}")]
    Provider {
        /// Error reported by the provider.
        message: String,
    },
    /// Provider credentials are missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The settings document could not be read.
    #[error(transparent)]
    ConfigStore(#[from] ConfigStoreError),
}

/// A routed request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invocation {
    /// Operation to perform.
    pub verb: MachineVerb,
    /// Alias or literal machine id; `default` when absent.
    pub target: Option<String>,
    /// Whether `list` probes processes.
    pub show_processes: bool,
}

impl Invocation {
    /// Creates an invocation without process probing.
    #[must_use]
    pub fn new(verb: MachineVerb, target: Option<String>) -> Self {
        Self {
            verb,
            target,
            show_processes: false,
        }
    }

    /// Enables process probing.
    #[must_use]
    pub const fn with_processes(mut self, show_processes: bool) -> Self {
        self.show_processes = show_processes;
        self
    }

    /// Alias to resolve against.
    #[must_use]
    pub fn alias(&self) -> &str {
        target_alias(self.target.as_deref())
    }
}

/// Trims `target`, falling back to `default` when it is absent or blank.
#[must_use]
pub fn target_alias(target: Option<&str>) -> &str {
    target
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .unwrap_or(DEFAULT_ALIAS)
}

/// Bounds for the SSH readiness probe run after `start`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SshReadiness {
    /// Port probed.
    pub port: u16,
    /// Pause between connection attempts.
    pub interval: Duration,
    /// Total time allowed.
    pub budget: Duration,
}

impl Default for SshReadiness {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            interval: Duration::from_secs(2),
            budget: Duration::from_secs(60),
        }
    }
}

/// Orchestrates one invocation against a single workstation.
pub struct Workstation<P, R, M, W>
where
    P: MachineProvider,
    R: CommandRunner + Clone,
    M: MountProbe,
    W: Write,
{
    provider: P,
    runner: R,
    mounts: MountSupervisor<R, M>,
    prober: ProcessProber<R>,
    waiter: StateWaiter,
    settings: Settings,
    overrides: Overrides,
    reporter: Reporter<W>,
    ssh_readiness: Option<SshReadiness>,
}

impl<P, R, M, W> Workstation<P, R, M, W>
where
    P: MachineProvider,
    R: CommandRunner + Clone,
    M: MountProbe,
    W: Write,
{
    /// Wires a workstation from its collaborators.
    #[must_use]
    pub fn new(
        provider: P,
        runner: R,
        mounts: MountSupervisor<R, M>,
        settings: Settings,
        overrides: Overrides,
        out: W,
    ) -> Self {
        Self {
            provider,
            prober: ProcessProber::new(runner.clone()),
            runner,
            mounts,
            waiter: StateWaiter::default(),
            settings,
            overrides,
            reporter: Reporter::new(out),
            ssh_readiness: Some(SshReadiness::default()),
        }
    }

    /// Replaces the state waiter.
    #[must_use]
    pub const fn with_waiter(mut self, waiter: StateWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Replaces or disables the SSH readiness probe.
    #[must_use]
    pub const fn with_ssh_readiness(mut self, readiness: Option<SshReadiness>) -> Self {
        self.ssh_readiness = readiness;
        self
    }

    /// Consumes the workstation and returns the output writer.
    pub fn into_output(self) -> W {
        self.reporter.into_inner()
    }

    /// Runs the handler for `invocation`.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError`] when a required parameter cannot be resolved or
    /// the target machine does not exist.
    pub async fn dispatch(&mut self, invocation: &Invocation) -> Result<(), FatalError> {
        let alias = invocation.alias();
        tracing::debug!(verb = ?invocation.verb, alias, "dispatching");
        match invocation.verb {
            MachineVerb::Start => self.start(alias).await,
            MachineVerb::Stop => self.stop(alias).await,
            MachineVerb::Mount => self.connect(alias).await,
            MachineVerb::Unmount => self.disconnect(alias).await,
            MachineVerb::Remount => self.reconnect(alias).await,
            MachineVerb::Terminal => self.terminal(alias).await,
            MachineVerb::Ip => self.print_ip(alias, false).await,
            MachineVerb::IpClean => self.print_ip(alias, true).await,
            MachineVerb::Hosts => self.hosts(alias).await,
            MachineVerb::List => self.list(invocation.show_processes).await,
        }
    }

    fn context<'a>(&'a self, session: &'a SessionCache, alias: &'a str) -> ResolutionContext<'a> {
        ResolutionContext::new(&self.overrides, session, &self.settings, alias)
    }

    async fn machine_id(&self, alias: &str) -> Result<MachineId, FatalError> {
        let session = SessionCache::default();
        let ctx = self.context(&session, alias);
        if let Some(machine_id) = ctx.machine_id() {
            return Ok(machine_id);
        }
        let known = self
            .provider
            .list_machines()
            .await
            .map_err(|err| FatalError::Provider {
                message: err.to_string(),
            })?;
        Ok(ctx.literal_machine_id(&known)?)
    }

    /// Describes the machine, reporting provider failures.
    ///
    /// Returns `Ok(None)` after reporting a provider failure.
    async fn lookup(&mut self, machine_id: &MachineId) -> Result<Option<MachineRef>, FatalError> {
        match self.provider.describe(machine_id).await {
            Ok(Some(mut machine)) => {
                machine.alias = self.settings.alias_for(&machine.id).map(str::to_owned);
                Ok(Some(machine))
            }
            Ok(None) => Err(FatalError::MissingMachine {
                machine_id: machine_id.to_string(),
            }),
            Err(err) => {
                tracing::warn!(machine_id = %machine_id, error = %err, "describe failed");
                self.reporter
                    .error(&format!("Could not query {machine_id}: {err}"));
                Ok(None)
            }
        }
    }

    async fn public_address(
        &mut self,
        machine_id: &MachineId,
    ) -> Result<Option<IpAddr>, FatalError> {
        let Some(machine) = self.lookup(machine_id).await? else {
            return Ok(None);
        };
        if machine.public_address.is_none() {
            self.reporter.error(&format!(
                "{machine_id} has no public address (state: {}).",
                machine.state
            ));
        }
        Ok(machine.public_address)
    }
}
