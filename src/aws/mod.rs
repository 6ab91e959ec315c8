//! Adapters that reach AWS through the `aws` command line tool.
//!
//! Every call runs `aws <service> <operation> ... --region R --output json`
//! through the injected `CommandExecutor`, parses stdout as JSON and turns
//! stderr of a failed call into an `AwsCliError` carrying the service error
//! code (e.g. `ParameterNotFound`, `ConflictException`).

pub mod agentcore;
pub mod ssm;
pub mod sts;

pub use agentcore::AgentCoreControlPlane;
pub use ssm::SsmParameterBackend;
pub use sts::{CallerIdentity, IdentityVerifier, StsIdentityVerifier};

use crate::traits::CommandExecutor;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

lazy_static! {
    static ref ERROR_CODE: Regex =
        Regex::new(r"An error occurred \(([A-Za-z0-9_.]+)\)[^:]*:\s*(.*)")
            .expect("error code pattern is valid");
}

/// A failed `aws` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCliError {
    /// Service error code, when the CLI reported one
    pub code: Option<String>,
    pub message: String,
}

impl fmt::Display for AwsCliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AwsCliError {}

impl AwsCliError {
    /// Whether the service reported `code`
    pub fn is(&self, code: &str) -> bool {
        self.code.as_deref().is_some_and(|c| c.contains(code))
    }

    /// Build from the stderr of a failed call
    fn from_stderr(stderr: &str, exit_code: Option<i32>) -> Self {
        if let Some(captures) = ERROR_CODE.captures(stderr) {
            return Self {
                code: Some(captures[1].to_string()),
                message: captures[2].trim().to_string(),
            };
        }

        let message = stderr.trim();
        Self {
            code: None,
            message: if message.is_empty() {
                format!("aws exited with status {}", exit_code.unwrap_or(-1))
            } else {
                message.to_string()
            },
        }
    }
}

/// Runs `aws` against one region
pub struct AwsCli {
    command: Arc<dyn CommandExecutor>,
    region: String,
    working_dir: PathBuf,
}

impl AwsCli {
    pub fn new(command: Arc<dyn CommandExecutor>, region: &str) -> Self {
        Self {
            command,
            region: region.to_string(),
            working_dir: PathBuf::from("."),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Call `operation` of `service` and return the decoded JSON response
    ///
    /// An empty response body decodes to `Value::Null`.
    pub fn call(&self, service: &str, operation: &str, args: &[&str]) -> Result<Value, AwsCliError> {
        let mut argv = vec![service, operation];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["--region", self.region.as_str(), "--output", "json"]);

        tracing::debug!(service, operation, region = %self.region, "aws call");

        let output = self
            .command
            .execute("aws", &argv, &[], &self.working_dir)
            .map_err(|err| AwsCliError {
                code: None,
                message: format!("could not run the aws CLI: {:#}", err),
            })?;

        if !output.status.success() {
            let err =
                AwsCliError::from_stderr(&String::from_utf8_lossy(&output.stderr), output.status.code());
            tracing::debug!(service, operation, code = ?err.code, "aws call failed");
            return Err(err);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&stdout).map_err(|err| AwsCliError {
            code: None,
            message: format!("unreadable {} {} response: {}", service, operation, err),
        })
    }
}
