use crate::config_store::{validate_namespace, DEFAULT_NAMESPACE};
use crate::error::DeployError;
use crate::provision::cdk::{DEFAULT_CDK_APP, DEFAULT_OUTPUTS_FILE};
use crate::traits::FileSystem;
use crate::verify::DEFAULT_TEST_COMMAND;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "gateway-deploy.yaml";

pub const API_VERSION: &str = "gateway-deploy/v1";

// ============================================================================
// DeployConfig Resource (Kubernetes-style)
// ============================================================================

/// Kubernetes-style DeployConfig resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfigResource {
    /// API version (e.g., "gateway-deploy/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Kind of resource (always "DeployConfig")
    pub kind: String,

    #[serde(default)]
    pub metadata: DeployConfigMetadata,

    #[serde(default)]
    pub spec: DeploySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfigMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Deployment settings; every field has a default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploySettings {
    /// Config store namespace
    pub namespace: String,

    /// Environment suffix of the stack name (e.g. "Dev")
    pub environment: String,

    /// Explicit stack name; derived from `environment` when unset
    pub stack_name: Option<String>,

    pub api_key_provider_name: String,

    pub oauth_provider_name: String,

    /// Command CDK runs to synthesize the app
    pub cdk_app: String,

    /// `--outputs-file` path, relative to `working_dir`
    pub outputs_file: PathBuf,

    /// Verification suite command
    pub test_command: String,

    /// Directory holding the CDK app and test suite
    pub working_dir: PathBuf,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            environment: "Dev".to_string(),
            stack_name: None,
            api_key_provider_name: "confluence-apikey-provider".to_string(),
            oauth_provider_name: "confluence-oauth-provider".to_string(),
            cdk_app: DEFAULT_CDK_APP.to_string(),
            outputs_file: PathBuf::from(DEFAULT_OUTPUTS_FILE),
            test_command: DEFAULT_TEST_COMMAND.to_string(),
            working_dir: PathBuf::from("."),
        }
    }
}

impl DeploySettings {
    /// Load settings from a DeployConfig file; a missing file yields the defaults
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        if !fs.exists(path) {
            tracing::debug!(path = %path.display(), "no deploy config file, using defaults");
            return Ok(Self::default());
        }

        let resource = DeployConfigResource::from_file(fs, path)
            .with_context(|| format!("Failed to load deploy config {}", path.display()))?;
        Ok(resource.spec)
    }

    pub fn stack_name(&self) -> String {
        match &self.stack_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("ConfluenceGatewayStack-{}", self.environment),
        }
    }
}

impl DeployConfigResource {
    /// Load a DeployConfig resource from a YAML file
    pub fn from_file(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs.read_to_string(path)?;
        let resource: DeployConfigResource = serde_yaml::from_str(&content)
            .map_err(|err| DeployError::ConfigFile(err.to_string()))?;

        // Validate kind
        if resource.kind != "DeployConfig" {
            return Err(DeployError::ConfigFile(format!(
                "Expected kind 'DeployConfig', got '{}'",
                resource.kind
            ))
            .into());
        }

        if resource.api_version != API_VERSION {
            tracing::warn!(api_version = %resource.api_version, "unrecognised deploy config apiVersion");
        }

        validate_namespace(resource.spec.namespace.trim_end_matches('/'))?;

        if resource.spec.environment.trim().is_empty() {
            return Err(DeployError::ConfigFile("spec.environment must not be empty".to_string()).into());
        }

        Ok(resource)
    }
}
