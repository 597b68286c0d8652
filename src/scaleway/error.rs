//! Error types for the Scaleway provider.

use crate::config::ConfigError;
use scaleway_rs::ScalewayError;
use thiserror::Error;

/// Errors raised by the Scaleway provider.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScalewayProviderError {
    /// Raised when the credentials are incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when an instance cannot be powered on from its current state.
    #[error("instance {instance_id} in state {state} cannot be powered on")]
    PowerOnNotAllowed {
        /// Provider instance identifier.
        instance_id: String,
        /// Current state reported by the provider.
        state: String,
    },
    /// Raised when an instance cannot be powered off from its current state.
    #[error("instance {instance_id} in state {state} cannot be powered off")]
    PowerOffNotAllowed {
        /// Provider instance identifier.
        instance_id: String,
        /// Current state reported by the provider.
        state: String,
    },
    /// Raised when a power action targets an instance the API does not know.
    #[error("instance {instance_id} not found in zone {zone}")]
    InstanceNotFound {
        /// Provider instance identifier.
        instance_id: String,
        /// Zone used for the lookup.
        zone: String,
    },
    /// Wrapper for provider level failures.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the provider SDK.
        message: String,
    },
}

impl From<ScalewayError> for ScalewayProviderError {
    fn from(value: ScalewayError) -> Self {
        Self::Provider {
            message: value.to_string(),
        }
    }
}

impl From<ConfigError> for ScalewayProviderError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
