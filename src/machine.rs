//! Machine identity and the provider capability used to drive it.
//!
//! The provider is injected so the orchestration layer never talks to a cloud
//! API directly. [`MachineRef`] values are produced by the provider on demand
//! and live for a single command invocation.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

/// Power state reported for a machine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MachineState {
    /// The machine is booting.
    Pending,
    /// The machine is powered on.
    Running,
    /// The machine is shutting down towards a stopped state.
    Stopping,
    /// The machine is powered off and can be started again.
    Stopped,
    /// The machine no longer exists.
    Terminated,
    /// The machine is shutting down towards termination.
    ShuttingDown,
    /// The provider reported a state the tool does not model.
    Unknown,
}

impl MachineState {
    /// Human-readable label used in tables and log lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Terminated => "Terminated",
            Self::ShuttingDown => "Shutting down",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Provider-assigned machine identifier, guaranteed non-empty.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MachineId(String);

impl MachineId {
    /// Wraps `value` after trimming, returning `None` when nothing remains.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for MachineId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Snapshot of a machine as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineRef {
    /// Provider-assigned identifier.
    pub id: String,
    /// Display name recorded by the provider, if any.
    pub name: Option<String>,
    /// Alias from the settings document; filled in by the workstation.
    pub alias: Option<String>,
    /// Public network address, when one is assigned.
    pub public_address: Option<IpAddr>,
    /// Power state at the time of the query.
    pub state: MachineState,
    /// Tag naming the credential allowed to access this machine.
    pub credential_key_name: Option<String>,
}

impl MachineRef {
    /// Creates a snapshot with only the identifier and state populated.
    #[must_use]
    pub fn new(id: impl Into<String>, state: MachineState) -> Self {
        Self {
            id: id.into(),
            name: None,
            alias: None,
            public_address: None,
            state,
            credential_key_name: None,
        }
    }

    /// Sets the public address.
    #[must_use]
    pub const fn with_public_address(mut self, address: IpAddr) -> Self {
        self.public_address = Some(address);
        self
    }

    /// Sets the provider display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the credential key tag.
    #[must_use]
    pub fn with_credential_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.credential_key_name = Some(key_name.into());
        self
    }
}

/// Future returned by provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Instance-management capability supplied by a cloud provider.
///
/// Retries and backoff for individual calls belong to the implementation;
/// the orchestration layer issues each call once.
pub trait MachineProvider {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists every machine visible to the configured account.
    fn list_machines(&self) -> ProviderFuture<'_, Vec<MachineRef>, Self::Error>;

    /// Describes one machine, returning `None` when it does not exist.
    fn describe<'a>(
        &'a self,
        machine_id: &'a MachineId,
    ) -> ProviderFuture<'a, Option<MachineRef>, Self::Error>;

    /// Requests a power-on transition.
    fn power_on<'a>(&'a self, machine_id: &'a MachineId) -> ProviderFuture<'a, (), Self::Error>;

    /// Requests a power-off transition.
    fn power_off<'a>(&'a self, machine_id: &'a MachineId) -> ProviderFuture<'a, (), Self::Error>;
}
