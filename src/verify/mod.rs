//! Post-deploy verification against the live gateway.
//!
//! Verification reads everything it needs from the config store, so it can run
//! right after a deploy or on its own against whatever the store holds now.

use crate::config_store::{ConfigStore, ParamKey};
use crate::error::{describe, DeployError, DeployResult};
use crate::traits::CommandExecutor;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Test suite run when the deploy configuration names none
pub const DEFAULT_TEST_COMMAND: &str = "python3 test/test_api_gateway.py";

/// The deployed gateway a verification run talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationTarget {
    pub gateway_id: String,
    pub gateway_url: String,
    pub region: String,
    pub confluence_subdomain: Option<String>,
    pub test_page_id: Option<String>,
}

impl VerificationTarget {
    /// MCP endpoint of a gateway
    pub fn gateway_url_for(gateway_id: &str, region: &str) -> String {
        format!(
            "https://{}.gateway.bedrock-agentcore.{}.amazonaws.com/mcp",
            gateway_id, region
        )
    }

    /// Gateway id is required; the Confluence settings are optional
    pub fn from_store(store: &ConfigStore, region: &str) -> DeployResult<Self> {
        let gateway_id = store.get(ParamKey::GatewayId)?;

        Ok(Self {
            gateway_url: Self::gateway_url_for(&gateway_id, region),
            gateway_id,
            region: region.to_string(),
            confluence_subdomain: store.get_optional(ParamKey::ConfluenceSubdomain)?,
            test_page_id: store.get_optional(ParamKey::TestPageId)?,
        })
    }

    /// Environment handed to the test suite
    pub fn environment(&self) -> Vec<(&str, &str)> {
        let mut env = vec![
            ("GATEWAY_ID", self.gateway_id.as_str()),
            ("GATEWAY_URL", self.gateway_url.as_str()),
            ("AWS_REGION", self.region.as_str()),
        ];
        if let Some(subdomain) = &self.confluence_subdomain {
            env.push(("CONFLUENCE_SUBDOMAIN", subdomain.as_str()));
        }
        if let Some(page_id) = &self.test_page_id {
            env.push(("TEST_PAGE_ID", page_id.as_str()));
        }
        env
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    pub message: Option<String>,
}

/// Outcome of one verification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub exit_code: i32,
    pub tests: Vec<TestResult>,
    pub duration_ms: u64,
}

impl TestReport {
    /// Build a report from the suite's console output
    ///
    /// A `TEST: <name>` line opens a test; the first `✅` or `❌` line below it
    /// decides its status, with `❌` winning over an earlier `✅`.
    pub fn from_console(stdout: &str, exit_code: i32, duration_ms: u64) -> Self {
        let mut tests: Vec<TestResult> = Vec::new();

        for line in stdout.lines().map(str::trim) {
            if let Some(name) = line.strip_prefix("TEST:") {
                tests.push(TestResult {
                    name: name.trim().to_string(),
                    status: TestStatus::Skipped,
                    message: None,
                });
                continue;
            }

            let Some(current) = tests.last_mut() else {
                continue;
            };

            if let Some(message) = line.strip_prefix('❌') {
                current.status = TestStatus::Failed;
                current.message = Some(message.trim().to_string());
            } else if let Some(message) = line.strip_prefix('✅') {
                if current.status == TestStatus::Skipped && current.message.is_none() {
                    current.status = TestStatus::Passed;
                    current.message = Some(message.trim().to_string());
                }
            } else if let Some(message) = line.strip_prefix("⚠️") {
                if current.status == TestStatus::Skipped {
                    current.message = Some(message.trim().to_string());
                }
            }
        }

        Self {
            exit_code,
            tests,
            duration_ms,
        }
    }

    pub fn count(&self, status: TestStatus) -> usize {
        self.tests.iter().filter(|t| t.status == status).count()
    }

    pub fn passed(&self) -> bool {
        self.exit_code == 0 && self.count(TestStatus::Failed) == 0
    }
}

/// Runs the post-deploy test suite
pub trait Verifier: Send + Sync {
    fn run(&self, target: &VerificationTarget) -> Result<TestReport>;
}

/// Runs a shell command and reads its console output
pub struct CommandVerifier {
    command: Arc<dyn CommandExecutor>,
    test_command: String,
    working_dir: PathBuf,
}

impl CommandVerifier {
    pub fn new(command: Arc<dyn CommandExecutor>, test_command: &str, working_dir: PathBuf) -> Self {
        Self {
            command,
            test_command: test_command.to_string(),
            working_dir,
        }
    }
}

impl Verifier for CommandVerifier {
    fn run(&self, target: &VerificationTarget) -> Result<TestReport> {
        tracing::info!(gateway_id = %target.gateway_id, "running verification suite");
        let started = Instant::now();

        let output = self
            .command
            .execute_shell(&self.test_command, &target.environment(), &self.working_dir)
            .with_context(|| format!("Failed to run test command '{}'", self.test_command))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = TestReport::from_console(
            &stdout,
            output.status.code().unwrap_or(-1),
            started.elapsed().as_millis() as u64,
        );

        if !report.passed() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                tracing::debug!(stderr = %stderr.trim(), "verification suite stderr");
            }
        }

        Ok(report)
    }
}

/// Run the suite against the gateway recorded in the store
///
/// A report with failures is a `VerificationError`.
pub fn run_verification(
    verifier: &dyn Verifier,
    store: &ConfigStore,
    region: &str,
) -> DeployResult<TestReport> {
    let target = VerificationTarget::from_store(store, region)?;

    let report = verifier
        .run(&target)
        .map_err(|err| DeployError::Verification(describe(&err)))?;

    if !report.passed() {
        let failed: Vec<&str> = report
            .tests
            .iter()
            .filter(|t| t.status == TestStatus::Failed)
            .map(|t| t.name.as_str())
            .collect();

        let detail = if failed.is_empty() {
            format!("test command exited with status {}", report.exit_code)
        } else {
            format!("{} failed", failed.join(", "))
        };
        return Err(DeployError::Verification(detail));
    }

    Ok(report)
}
