use super::{Provisioner, TargetEnvironment};
use crate::traits::{CommandExecutor, FileSystem};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Default CDK app command
pub const DEFAULT_CDK_APP: &str = "python3 infra/app.py";

/// Default location of the `--outputs-file` document, relative to the working directory
pub const DEFAULT_OUTPUTS_FILE: &str = "cdk-outputs.json";

/// AWS CDK provisioner
pub struct CdkProvisioner {
    command: Arc<dyn CommandExecutor>,
    fs: Arc<dyn FileSystem>,
    app: String,
    working_dir: PathBuf,
    outputs_file: PathBuf,
}

impl CdkProvisioner {
    pub fn new(command: Arc<dyn CommandExecutor>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            command,
            fs,
            app: DEFAULT_CDK_APP.to_string(),
            working_dir: PathBuf::from("."),
            outputs_file: PathBuf::from(DEFAULT_OUTPUTS_FILE),
        }
    }

    pub fn with_app(mut self, app: &str) -> Self {
        self.app = app.to_string();
        self
    }

    pub fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = working_dir;
        self
    }

    pub fn with_outputs_file(mut self, outputs_file: PathBuf) -> Self {
        self.outputs_file = outputs_file;
        self
    }

    fn outputs_path(&self) -> PathBuf {
        self.working_dir.join(&self.outputs_file)
    }

    /// The CDK app resolves its environment from these
    fn environment(target: &TargetEnvironment) -> [(&str, &str); 3] {
        [
            ("CDK_DEFAULT_ACCOUNT", target.account.as_str()),
            ("CDK_DEFAULT_REGION", target.region.as_str()),
            ("AWS_REGION", target.region.as_str()),
        ]
    }

    fn run_interactive(&self, args: &[&str], target: &TargetEnvironment) -> Result<()> {
        let code = self
            .command
            .execute_interactive("cdk", args, &Self::environment(target), &self.working_dir)
            .with_context(|| format!("Failed to execute cdk {}", args[0]))?;

        if code != 0 {
            anyhow::bail!("cdk {} exited with status {}", args[0], code);
        }
        Ok(())
    }
}

impl Provisioner for CdkProvisioner {
    fn get_name(&self) -> &str {
        "cdk"
    }

    fn check_installed(&self) -> Result<bool> {
        Ok(self.command.is_available("cdk"))
    }

    fn bootstrap(&self, target: &TargetEnvironment) -> Result<()> {
        let environment = target.to_string();
        self.run_interactive(&["bootstrap", &environment, "--app", &self.app], target)
    }

    fn synth(&self, stack: &str, target: &TargetEnvironment) -> Result<()> {
        let output = self
            .command
            .execute(
                "cdk",
                &["synth", stack, "--app", &self.app, "--quiet"],
                &Self::environment(target),
                &self.working_dir,
            )
            .context("Failed to execute cdk synth")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no diagnostics")
                .trim();
            anyhow::bail!("cdk synth {} failed: {}", stack, reason);
        }
        Ok(())
    }

    fn deploy(&self, stack: &str, target: &TargetEnvironment) -> Result<Option<String>> {
        let outputs_path = self.outputs_path();

        // A document left by an earlier run must not pass for this run's outputs
        if self.fs.exists(&outputs_path) {
            self.fs.remove_file(&outputs_path)?;
        }

        let outputs_arg = self.outputs_file.to_string_lossy().to_string();
        self.run_interactive(
            &[
                "deploy",
                stack,
                "--app",
                &self.app,
                "--require-approval",
                "never",
                "--outputs-file",
                &outputs_arg,
            ],
            target,
        )?;

        if !self.fs.exists(&outputs_path) {
            tracing::warn!(path = %outputs_path.display(), "cdk deploy wrote no outputs file");
            return Ok(None);
        }

        let raw = self.fs.read_to_string(&outputs_path)?;
        Ok(Some(raw))
    }
}
