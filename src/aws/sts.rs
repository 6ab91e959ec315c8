use super::AwsCli;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;

/// Who the pipeline is running as
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

/// Verifies that the caller can authenticate to the cloud control plane
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self) -> Result<CallerIdentity>;
}

/// `aws sts get-caller-identity`
pub struct StsIdentityVerifier {
    cli: Arc<AwsCli>,
}

impl StsIdentityVerifier {
    pub fn new(cli: Arc<AwsCli>) -> Self {
        Self { cli }
    }
}

impl IdentityVerifier for StsIdentityVerifier {
    fn verify(&self) -> Result<CallerIdentity> {
        let response = self
            .cli
            .call("sts", "get-caller-identity", &[])
            .context("aws sts get-caller-identity failed")?;

        serde_json::from_value(response).context("unexpected get-caller-identity response")
    }
}
