//! Test helpers: fakes for every external collaborator and a harness wiring them
//! into a `Context`.

#![cfg(test)]

use crate::aws::{CallerIdentity, IdentityVerifier};
use crate::config_store::memory::InMemoryParameterBackend;
use crate::config_store::{ConfigStore, ParamKind, DEFAULT_NAMESPACE};
use crate::context::Context;
use crate::credentials::memory::InMemoryControlPlane;
use crate::pipeline::{CredentialInputs, RunContext, RunMode};
use crate::provision::{Provisioner, TargetEnvironment};
use crate::traits::MockOutput;
use crate::verify::{TestReport, TestResult, TestStatus, VerificationTarget, Verifier};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Account the fake caller belongs to
pub const ACCOUNT: &str = "123456789012";

/// Caller identity that succeeds unless told to fail
pub struct FakeIdentity {
    failure: Mutex<Option<String>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self {
            failure: Mutex::new(None),
        }
    }

    pub fn fail(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }
}

impl IdentityVerifier for FakeIdentity {
    fn verify(&self) -> Result<CallerIdentity> {
        if let Some(message) = self.failure.lock().unwrap().as_ref() {
            anyhow::bail!("{}", message);
        }

        Ok(CallerIdentity {
            account: ACCOUNT.to_string(),
            arn: format!("arn:aws:iam::{}:user/ci", ACCOUNT),
            user_id: "AIDAEXAMPLE".to_string(),
        })
    }
}

/// Provisioner that records calls and returns a scripted output document
pub struct FakeProvisioner {
    installed: Mutex<bool>,
    outputs: Mutex<Option<String>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    targets: Mutex<Vec<TargetEnvironment>>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self {
            installed: Mutex::new(true),
            outputs: Mutex::new(None),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Document returned by `deploy`; without one, deploy writes no document
    pub fn set_outputs(&self, raw: &str) {
        *self.outputs.lock().unwrap() = Some(raw.to_string());
    }

    pub fn set_installed(&self, installed: bool) {
        *self.installed.lock().unwrap() = installed;
    }

    /// Make `operation` ("bootstrap", "synth" or "deploy") fail with `message`
    pub fn fail_on(&self, operation: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<TargetEnvironment> {
        self.targets.lock().unwrap().clone()
    }

    fn call(&self, operation: &str, target: &TargetEnvironment) -> Result<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        self.targets.lock().unwrap().push(target.clone());

        match self.failures.lock().unwrap().get(operation) {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }
}

impl Provisioner for FakeProvisioner {
    fn get_name(&self) -> &str {
        "fake-cdk"
    }

    fn check_installed(&self) -> Result<bool> {
        Ok(*self.installed.lock().unwrap())
    }

    fn bootstrap(&self, target: &TargetEnvironment) -> Result<()> {
        self.call("bootstrap", target)
    }

    fn synth(&self, _stack: &str, target: &TargetEnvironment) -> Result<()> {
        self.call("synth", target)
    }

    fn deploy(&self, _stack: &str, target: &TargetEnvironment) -> Result<Option<String>> {
        self.call("deploy", target)?;
        Ok(self.outputs.lock().unwrap().clone())
    }
}

/// Verifier reporting one passing test, plus a failing one when asked
pub struct FakeVerifier {
    failing_test: Mutex<Option<String>>,
    runs: Mutex<Vec<String>>,
}

impl FakeVerifier {
    pub fn new() -> Self {
        Self {
            failing_test: Mutex::new(None),
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_test(&self, name: &str) {
        *self.failing_test.lock().unwrap() = Some(name.to_string());
    }

    /// Gateway ids the suite ran against
    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

impl Verifier for FakeVerifier {
    fn run(&self, target: &VerificationTarget) -> Result<TestReport> {
        self.runs.lock().unwrap().push(target.gateway_id.clone());

        let mut tests = vec![TestResult {
            name: "List Gateway Tools".to_string(),
            status: TestStatus::Passed,
            message: Some("Gateway accessible".to_string()),
        }];

        let failing = self.failing_test.lock().unwrap().clone();
        if let Some(name) = &failing {
            tests.push(TestResult {
                name: name.clone(),
                status: TestStatus::Failed,
                message: Some("Error".to_string()),
            });
        }

        Ok(TestReport {
            exit_code: if failing.is_some() { 1 } else { 0 },
            tests,
            duration_ms: 3,
        })
    }
}

/// All fakes behind one `Context`
pub struct TestHarness {
    pub output: Arc<MockOutput>,
    pub backend: Arc<InMemoryParameterBackend>,
    pub control_plane: Arc<InMemoryControlPlane>,
    pub identity: Arc<FakeIdentity>,
    pub provisioner: Arc<FakeProvisioner>,
    pub verifier: Arc<FakeVerifier>,
}

impl TestHarness {
    /// Harness with an empty config store
    pub fn new() -> Self {
        Self {
            output: Arc::new(MockOutput::new()),
            backend: Arc::new(InMemoryParameterBackend::new()),
            control_plane: Arc::new(InMemoryControlPlane::new()),
            identity: Arc::new(FakeIdentity::new()),
            provisioner: Arc::new(FakeProvisioner::new()),
            verifier: Arc::new(FakeVerifier::new()),
        }
    }

    /// Harness whose store holds what the one-time setup writes
    pub fn seeded() -> Self {
        let harness = Self::new();
        harness.seed("aws-account-id", ACCOUNT);
        harness.seed("aws-region", "us-east-1");
        harness.seed("confluence-subdomain", "acme");
        harness
    }

    /// Seed a plain entry below the default namespace
    pub fn seed(&self, name: &str, value: &str) {
        self.backend.seed(
            &format!("{}/{}", DEFAULT_NAMESPACE, name),
            value,
            ParamKind::Plain,
        );
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.backend.clone(), DEFAULT_NAMESPACE).unwrap()
    }

    pub fn context(&self) -> Context {
        Context::test_with(
            self.output.clone(),
            "us-east-1",
            self.identity.clone(),
            self.store(),
            self.control_plane.clone(),
            self.provisioner.clone(),
            self.verifier.clone(),
        )
    }

    pub fn run_context(&self, mode: RunMode, inputs: CredentialInputs) -> RunContext {
        RunContext {
            run_id: Uuid::new_v4(),
            mode,
            region: "us-east-1".to_string(),
            stack_name: "ConfluenceGatewayStack-Dev".to_string(),
            environment: "Dev".to_string(),
            api_key_provider_name: "confluence-apikey-provider".to_string(),
            oauth_provider_name: "confluence-oauth-provider".to_string(),
            inputs,
        }
    }
}
