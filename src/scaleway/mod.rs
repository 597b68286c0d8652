//! Scaleway implementation of the machine provider capability.

mod error;
mod snapshot;

use scaleway_rs::ScalewayApi;

use crate::config::ScalewayConfig;
use crate::machine::{MachineId, MachineProvider, MachineRef, ProviderFuture};
use snapshot::{InstanceSnapshot, POWER_OFF, POWER_ON};

pub use error::ScalewayProviderError;
pub use snapshot::{CREDENTIAL_TAG_PREFIX, credential_tag, map_state};

/// Power transition requested through the Instances API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PowerTransition {
    On,
    Off,
}

impl PowerTransition {
    const fn action(self) -> &'static str {
        match self {
            Self::On => POWER_ON,
            Self::Off => POWER_OFF,
        }
    }

    const fn settled_states(self) -> &'static [&'static str] {
        match self {
            Self::On => &["running", "starting"],
            Self::Off => &["stopped", "stopped in place", "stopping"],
        }
    }

    fn refusal(self, snapshot: &InstanceSnapshot) -> ScalewayProviderError {
        let instance_id = snapshot.id.clone();
        let state = snapshot.state.clone();
        match self {
            Self::On => ScalewayProviderError::PowerOnNotAllowed { instance_id, state },
            Self::Off => ScalewayProviderError::PowerOffNotAllowed { instance_id, state },
        }
    }
}

/// Decides which action, if any, moves `snapshot` towards `transition`.
///
/// Servers already in or heading to the requested state need no action.
fn plan_transition(
    snapshot: &InstanceSnapshot,
    transition: PowerTransition,
) -> Result<Option<&'static str>, ScalewayProviderError> {
    if transition
        .settled_states()
        .contains(&snapshot.state.as_str())
    {
        return Ok(None);
    }
    if snapshot.allows(transition.action()) {
        return Ok(Some(transition.action()));
    }
    Err(transition.refusal(snapshot))
}

/// Provider that drives a workstation through the Scaleway Instances API.
#[derive(Clone)]
pub struct ScalewayProvider {
    api: ScalewayApi,
    zone: String,
}

impl ScalewayProvider {
    /// Constructs a provider from validated credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ScalewayProviderError::Config`] when the credentials fail
    /// validation.
    pub fn new(config: &ScalewayConfig) -> Result<Self, ScalewayProviderError> {
        config.validate()?;
        Ok(Self {
            api: ScalewayApi::new(&config.secret_key),
            zone: config.default_zone.clone(),
        })
    }

    /// Zone the provider operates in.
    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }

    async fn fetch(
        &self,
        machine_id: &MachineId,
    ) -> Result<Option<InstanceSnapshot>, ScalewayProviderError> {
        let mut servers = self
            .api
            .list_instances(&self.zone)
            .servers(machine_id.as_str())
            .per_page(1)
            .run_async()
            .await?;
        Ok(servers.pop().map(InstanceSnapshot::from))
    }

    async fn transition(
        &self,
        machine_id: &MachineId,
        transition: PowerTransition,
    ) -> Result<(), ScalewayProviderError> {
        let snapshot =
            self.fetch(machine_id)
                .await?
                .ok_or_else(|| ScalewayProviderError::InstanceNotFound {
                    instance_id: machine_id.to_string(),
                    zone: self.zone.clone(),
                })?;

        let Some(action) = plan_transition(&snapshot, transition)? else {
            tracing::debug!(
                machine = %machine_id,
                state = %snapshot.state,
                "power transition not needed"
            );
            return Ok(());
        };

        tracing::debug!(machine = %machine_id, action, "requesting power action");
        self.api
            .perform_instance_action_async(&self.zone, machine_id.as_str(), action)
            .await?;
        Ok(())
    }
}

impl MachineProvider for ScalewayProvider {
    type Error = ScalewayProviderError;

    fn list_machines(&self) -> ProviderFuture<'_, Vec<MachineRef>, Self::Error> {
        Box::pin(async move {
            // `run_async` walks pages until one comes back empty; this sets the batch size.
            let servers = self
                .api
                .list_instances(&self.zone)
                .per_page(100)
                .run_async()
                .await?;
            Ok(servers
                .into_iter()
                .map(|server| InstanceSnapshot::from(server).into_machine_ref())
                .collect())
        })
    }

    fn describe<'a>(
        &'a self,
        machine_id: &'a MachineId,
    ) -> ProviderFuture<'a, Option<MachineRef>, Self::Error> {
        Box::pin(async move {
            Ok(self
                .fetch(machine_id)
                .await?
                .map(InstanceSnapshot::into_machine_ref))
        })
    }

    fn power_on<'a>(&'a self, machine_id: &'a MachineId) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move { self.transition(machine_id, PowerTransition::On).await })
    }

    fn power_off<'a>(&'a self, machine_id: &'a MachineId) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move { self.transition(machine_id, PowerTransition::Off).await })
    }
}
