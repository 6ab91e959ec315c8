pub mod cdk;
pub mod outputs;

pub use cdk::CdkProvisioner;
pub use outputs::{OutputExtractor, StackOutput, NOT_SET_YET};

use anyhow::Result;
use std::fmt;

/// Account and region a stack is deployed into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnvironment {
    pub account: String,
    pub region: String,
}

impl fmt::Display for TargetEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aws://{}/{}", self.account, self.region)
    }
}

/// Trait for the infrastructure-as-code toolchain that owns the gateway stack
pub trait Provisioner: Send + Sync {
    /// Get the name of this provisioner (e.g., "cdk")
    fn get_name(&self) -> &str;

    /// Check if the toolchain is installed and available
    fn check_installed(&self) -> Result<bool>;

    /// Prepare the target environment for deployments; safe to repeat
    fn bootstrap(&self, target: &TargetEnvironment) -> Result<()>;

    /// Render and validate the stack templates without touching the environment
    fn synth(&self, stack: &str, target: &TargetEnvironment) -> Result<()>;

    /// Apply the stack and return the raw output document, if one was written
    fn deploy(&self, stack: &str, target: &TargetEnvironment) -> Result<Option<String>>;
}
