//! Namespaced facade over the external parameter service.
//!
//! The store is the only channel for state that outlives a stage: setup writes
//! account/region/Confluence settings, the reconciler writes provider
//! references and the pipeline writes the gateway id after apply. Entries are
//! only ever overwritten in full, never deleted.

#[cfg(test)]
pub mod memory;

use crate::error::{describe, DeployError, DeployResult};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Namespace used when the deploy configuration does not set one
pub const DEFAULT_NAMESPACE: &str = "/confluence/gateway";

/// Placeholder printed instead of secret values
pub const MASKED_VALUE: &str = "********";

lazy_static! {
    static ref NAMESPACE_PATTERN: Regex =
        Regex::new(r"^(/[A-Za-z0-9_.\-]+)+$").expect("namespace pattern is valid");
}

/// How a parameter is stored at rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Stored as plain text
    Plain,
    /// Stored with the service's secret-at-rest encryption
    Secret,
}

/// Well-known paths inside the namespace
///
/// The kind of each path is fixed here, so a secret can never be written as
/// plain text by a caller choosing the wrong type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    AwsAccountId,
    AwsRegion,
    ConfluenceSubdomain,
    ConfluenceEmail,
    ConfluenceApiToken,
    CredentialProviderArn,
    OAuthCredentialProviderArn,
    GatewayId,
    TestPageId,
}

impl ParamKey {
    pub const ALL: [ParamKey; 9] = [
        ParamKey::AwsAccountId,
        ParamKey::AwsRegion,
        ParamKey::ConfluenceSubdomain,
        ParamKey::ConfluenceEmail,
        ParamKey::ConfluenceApiToken,
        ParamKey::CredentialProviderArn,
        ParamKey::OAuthCredentialProviderArn,
        ParamKey::GatewayId,
        ParamKey::TestPageId,
    ];

    /// Path segment below the namespace
    pub fn name(&self) -> &'static str {
        match self {
            ParamKey::AwsAccountId => "aws-account-id",
            ParamKey::AwsRegion => "aws-region",
            ParamKey::ConfluenceSubdomain => "confluence-subdomain",
            ParamKey::ConfluenceEmail => "confluence-email",
            ParamKey::ConfluenceApiToken => "confluence-api-token",
            ParamKey::CredentialProviderArn => "credential-provider-arn",
            ParamKey::OAuthCredentialProviderArn => "oauth-credential-provider-arn",
            ParamKey::GatewayId => "gateway-id",
            ParamKey::TestPageId => "test-page-id",
        }
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            ParamKey::ConfluenceApiToken => ParamKind::Secret,
            _ => ParamKind::Plain,
        }
    }

    /// Who is expected to write the entry
    pub fn writer(&self) -> &'static str {
        match self {
            ParamKey::CredentialProviderArn | ParamKey::OAuthCredentialProviderArn => {
                "credential provider reconciliation"
            }
            ParamKey::GatewayId => "deploy (persist outputs)",
            ParamKey::TestPageId => "setup (optional)",
            _ => "setup",
        }
    }

    /// Description attached when the entry is written
    pub fn description(&self) -> &'static str {
        match self {
            ParamKey::AwsAccountId => "AWS account the gateway stack is deployed to",
            ParamKey::AwsRegion => "AWS region the gateway stack is deployed to",
            ParamKey::ConfluenceSubdomain => "Atlassian subdomain of the Confluence site",
            ParamKey::ConfluenceEmail => "Atlassian account email used for API calls",
            ParamKey::ConfluenceApiToken => "Atlassian API token",
            ParamKey::CredentialProviderArn => {
                "ARN of Confluence API Key credential provider in AgentCore"
            }
            ParamKey::OAuthCredentialProviderArn => {
                "ARN of Confluence OAuth 2.0 credential provider in AgentCore"
            }
            ParamKey::GatewayId => "Identifier of the deployed AgentCore gateway",
            ParamKey::TestPageId => "Confluence page used by verification tests",
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Raw access to the external parameter service
///
/// Implementations deal in absolute paths; the namespace is applied by `ConfigStore`.
pub trait ParameterBackend: Send + Sync {
    /// Read a parameter, decrypting secrets. `Ok(None)` when the path holds no entry.
    fn get_parameter(&self, path: &str) -> Result<Option<String>>;

    /// Create or overwrite a parameter
    fn put_parameter(
        &self,
        path: &str,
        value: &str,
        kind: ParamKind,
        description: Option<&str>,
    ) -> Result<()>;

    /// All parameter paths under `prefix`, recursively
    fn list_parameters(&self, prefix: &str) -> Result<BTreeSet<String>>;
}

/// Namespace-bound facade used by every stage
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn ParameterBackend>,
    namespace: String,
}

impl ConfigStore {
    /// Bind a backend to a namespace such as `/confluence/gateway`
    pub fn new(backend: Arc<dyn ParameterBackend>, namespace: &str) -> DeployResult<Self> {
        let namespace = namespace.trim_end_matches('/');
        validate_namespace(namespace)?;

        Ok(Self {
            backend,
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Absolute path of a well-known key
    pub fn path_for(&self, key: ParamKey) -> String {
        format!("{}/{}", self.namespace, key.name())
    }

    /// Read a required entry; absence is `MissingConfigParameter`
    pub fn get(&self, key: ParamKey) -> DeployResult<String> {
        self.get_optional(key)?
            .ok_or_else(|| DeployError::MissingConfigParameter {
                path: self.path_for(key),
            })
    }

    /// Read an entry whose absence the caller handles explicitly
    pub fn get_optional(&self, key: ParamKey) -> DeployResult<Option<String>> {
        let path = self.path_for(key);
        let value = self
            .backend
            .get_parameter(&path)
            .map_err(|err| DeployError::ConfigStore {
                path: path.clone(),
                message: describe(&err),
            })?;

        tracing::debug!(path = %path, found = value.is_some(), "config store read");
        Ok(value)
    }

    /// Overwrite an entry using the storage type fixed for its key
    pub fn put(&self, key: ParamKey, value: &str) -> DeployResult<()> {
        let path = self.path_for(key);

        if value.trim().is_empty() {
            return Err(DeployError::InvalidRunInput(format!(
                "refusing to store an empty value at '{}'",
                path
            )));
        }

        self.backend
            .put_parameter(&path, value, key.kind(), Some(key.description()))
            .map_err(|err| DeployError::ConfigStore {
                path: path.clone(),
                message: describe(&err),
            })?;

        tracing::info!(path = %path, kind = ?key.kind(), "config store entry written");
        Ok(())
    }

    /// Paths stored under `prefix` (absolute, or relative to the namespace)
    ///
    /// For diagnostics only; stage control flow never depends on listings.
    pub fn list_by_prefix(&self, prefix: &str) -> DeployResult<BTreeSet<String>> {
        let prefix = if prefix.is_empty() {
            self.namespace.clone()
        } else if prefix.starts_with('/') {
            prefix.trim_end_matches('/').to_string()
        } else {
            format!("{}/{}", self.namespace, prefix.trim_end_matches('/'))
        };

        self.backend
            .list_parameters(&prefix)
            .map_err(|err| DeployError::ConfigStore {
                path: prefix,
                message: describe(&err),
            })
    }
}

/// Check that a namespace is an absolute parameter hierarchy path
pub fn validate_namespace(namespace: &str) -> DeployResult<()> {
    if NAMESPACE_PATTERN.is_match(namespace) {
        Ok(())
    } else {
        Err(DeployError::ConfigFile(format!(
            "namespace '{}' must be an absolute path such as {}",
            namespace, DEFAULT_NAMESPACE
        )))
    }
}
