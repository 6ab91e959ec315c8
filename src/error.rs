use thiserror::Error;

/// Failure kinds surfaced by pipeline stages.
///
/// Every variant carries only plain strings so a failed `StageResult` can be
/// cloned into the run record and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployError {
    /// The caller could not be verified against the cloud control plane
    #[error("caller identity could not be verified: {0}")]
    Authentication(String),

    /// A required config store path holds no entry
    #[error("required parameter '{path}' was not found in the config store")]
    MissingConfigParameter { path: String },

    /// The identity-provider control plane rejected a create or update
    #[error("credential provider '{provider}' could not be reconciled: {message}")]
    ProviderReconciliation { provider: String, message: String },

    /// The target environment could not be prepared for provisioning
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    /// Templates failed structural validation (synth)
    #[error("template validation failed: {0}")]
    Validation(String),

    /// The apply step itself failed
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// The provisioning output document is structurally malformed
    #[error("stack outputs could not be parsed: {0}")]
    OutputParsing(String),

    /// Post-deploy verification failed
    #[error("verification failed: {0}")]
    Verification(String),

    /// A run input was present but unusable
    #[error("invalid run input: {0}")]
    InvalidRunInput(String),

    /// The parameter service call itself failed (not a missing entry)
    #[error("config store call for '{path}' failed: {message}")]
    ConfigStore { path: String, message: String },

    /// The deploy configuration file could not be used
    #[error("deploy configuration error: {0}")]
    ConfigFile(String),
}

impl DeployError {
    /// Name of the error kind, used in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Authentication(_) => "AuthenticationError",
            DeployError::MissingConfigParameter { .. } => "MissingConfigParameter",
            DeployError::ProviderReconciliation { .. } => "ProviderReconciliationError",
            DeployError::Bootstrap(_) => "BootstrapError",
            DeployError::Validation(_) => "ValidationError",
            DeployError::Provisioning(_) => "ProvisioningError",
            DeployError::OutputParsing(_) => "OutputParsingError",
            DeployError::Verification(_) => "VerificationError",
            DeployError::InvalidRunInput(_) => "InvalidRunInput",
            DeployError::ConfigStore { .. } => "ConfigStoreError",
            DeployError::ConfigFile(_) => "ConfigFileError",
        }
    }
}

/// Result type for pipeline operations
pub type DeployResult<T> = Result<T, DeployError>;

/// Render an adapter error with its whole context chain on one line
pub fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_message_names_path() {
        let err = DeployError::MissingConfigParameter {
            path: "/confluence/gateway/gateway-id".to_string(),
        };

        assert!(err.to_string().contains("/confluence/gateway/gateway-id"));
        assert_eq!(err.kind(), "MissingConfigParameter");
    }

    #[test]
    fn test_describe_keeps_context_chain() {
        let err = anyhow::anyhow!("exit status 255").context("aws sts get-caller-identity failed");
        assert_eq!(
            describe(&err),
            "aws sts get-caller-identity failed: exit status 255"
        );
    }
}
