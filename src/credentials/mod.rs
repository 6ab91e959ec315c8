//! Credential providers in the identity-provider control plane.
//!
//! A provider stores the secret material the gateway uses for outbound calls
//! to Confluence. This crate never owns the provider; it converges it to the
//! desired material and caches its reference in the config store.

pub mod material;
pub mod reconciler;

#[cfg(test)]
pub mod memory;

pub use material::{ProviderKind, Secret, SecretMaterial};
pub use reconciler::CredentialProviderReconciler;

use thiserror::Error;

/// Errors reported by a control plane adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    /// A provider with the requested name already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other rejection or transport failure
    #[error("{0}")]
    Rejected(String),
}

/// Operations the reconciler needs from the identity-provider control plane
pub trait CredentialControlPlane: Send + Sync {
    /// Reference of the provider named `name`, or `None` when it does not exist
    fn find_provider(
        &self,
        kind: ProviderKind,
        name: &str,
    ) -> Result<Option<String>, ControlPlaneError>;

    /// Create a provider and return the reference assigned to it
    fn create_provider(
        &self,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<String, ControlPlaneError>;

    /// Replace the secret material of an existing provider
    fn update_provider(
        &self,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), ControlPlaneError>;
}
