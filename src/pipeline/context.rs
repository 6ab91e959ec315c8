use super::RunMode;
use crate::credentials::Secret;
use uuid::Uuid;

/// Secret material supplied for this run
///
/// Only `main` reads the process environment; stages see these values and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialInputs {
    /// Base64 `email:api_token` pair
    pub api_key: Option<Secret>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<Secret>,
}

impl CredentialInputs {
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.oauth_client_id.is_none() && self.oauth_client_secret.is_none()
    }

    /// Exactly one of the two OAuth inputs is set
    pub fn oauth_incomplete(&self) -> bool {
        self.oauth_client_id.is_some() != self.oauth_client_secret.is_some()
    }
}

/// Immutable settings threaded through every stage of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub mode: RunMode,
    /// Region the context resolved; bootstrap rejects a stored `aws-region` that disagrees
    pub region: String,
    pub stack_name: String,
    pub environment: String,
    pub api_key_provider_name: String,
    pub oauth_provider_name: String,
    pub inputs: CredentialInputs,
}
