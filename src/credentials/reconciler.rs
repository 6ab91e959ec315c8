use super::{ControlPlaneError, CredentialControlPlane, ProviderKind, SecretMaterial};
use crate::config_store::ConfigStore;
use crate::error::{DeployError, DeployResult};
use std::fmt;

/// What reconciliation did to the external provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Updated,
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileAction::Created => write!(f, "created"),
            ReconcileAction::Updated => write!(f, "updated"),
        }
    }
}

/// Outcome of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub name: String,
    pub kind: ProviderKind,
    pub provider_ref: String,
    pub action: ReconcileAction,
}

/// Converges a named credential provider to the desired secret material
///
/// Look up by name, create when absent, otherwise update in place and keep the
/// existing reference, then cache the reference in the config store. Repeated
/// calls with the same name leave exactly one provider behind. Two processes
/// reconciling the same name at once are not serialized.
pub struct CredentialProviderReconciler<'a> {
    control_plane: &'a dyn CredentialControlPlane,
    store: &'a ConfigStore,
}

impl<'a> CredentialProviderReconciler<'a> {
    pub fn new(control_plane: &'a dyn CredentialControlPlane, store: &'a ConfigStore) -> Self {
        Self {
            control_plane,
            store,
        }
    }

    pub fn reconcile(&self, name: &str, material: &SecretMaterial) -> DeployResult<Reconciled> {
        let kind = material.kind();
        let rejected = |err: ControlPlaneError| DeployError::ProviderReconciliation {
            provider: name.to_string(),
            message: err.to_string(),
        };

        let existing = self.control_plane.find_provider(kind, name).map_err(rejected)?;

        let (provider_ref, action) = match existing {
            Some(provider_ref) => {
                self.control_plane
                    .update_provider(name, material)
                    .map_err(rejected)?;
                (provider_ref, ReconcileAction::Updated)
            }
            None => match self.control_plane.create_provider(name, material) {
                Ok(provider_ref) => (provider_ref, ReconcileAction::Created),
                Err(ControlPlaneError::Conflict(reason)) => {
                    // Created by someone else since the lookup; converge onto theirs
                    tracing::warn!(provider = name, %reason, "create conflicted, updating instead");
                    let provider_ref = self
                        .control_plane
                        .find_provider(kind, name)
                        .map_err(rejected)?
                        .ok_or_else(|| DeployError::ProviderReconciliation {
                            provider: name.to_string(),
                            message: format!(
                                "create reported a conflict but no provider is visible ({})",
                                reason
                            ),
                        })?;
                    self.control_plane
                        .update_provider(name, material)
                        .map_err(rejected)?;
                    (provider_ref, ReconcileAction::Updated)
                }
                Err(err) => return Err(rejected(err)),
            },
        };

        if provider_ref.trim().is_empty() {
            return Err(DeployError::ProviderReconciliation {
                provider: name.to_string(),
                message: "control plane returned an empty provider reference".to_string(),
            });
        }

        self.store.put(kind.param_key(), &provider_ref)?;

        tracing::info!(provider = name, kind = %kind, %action, "credential provider reconciled");

        Ok(Reconciled {
            name: name.to_string(),
            kind,
            provider_ref,
            action,
        })
    }
}
