use super::{PipelineRun, RunContext, Stage, StageResult};
use crate::aws::CallerIdentity;
use crate::config_store::ParamKey;
use crate::context::Context;
use crate::credentials::{CredentialProviderReconciler, SecretMaterial};
use crate::error::{describe, DeployError, DeployResult};
use crate::provision::{OutputExtractor, StackOutput, TargetEnvironment, NOT_SET_YET};
use crate::verify::{run_verification, TestStatus};
use chrono::Utc;
use std::ops::ControlFlow;

/// Outcome of a stage that is allowed to skip
enum Step<T> {
    Done(T),
    Skip(String),
}

/// Runs the deployment stages in order for one `RunContext`
pub struct PipelineOrchestrator<'a> {
    ctx: &'a Context,
    run: &'a RunContext,
    planned: Vec<Stage>,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(ctx: &'a Context, run: &'a RunContext) -> Self {
        Self {
            ctx,
            run,
            planned: Stage::planned(run.mode),
        }
    }

    /// Execute the pipeline; the returned run decides the exit status
    pub fn execute(&self) -> PipelineRun {
        let mut pipeline = PipelineRun::new(self.run.run_id, self.run.mode);
        tracing::info!(run_id = %self.run.run_id, stack = %self.run.stack_name, "pipeline started");

        if let ControlFlow::Break(()) = self.stages(&mut pipeline) {
            match pipeline.failure() {
                Some((stage, err)) => {
                    tracing::error!(run_id = %self.run.run_id, %stage, kind = err.kind(), "pipeline aborted")
                }
                None => tracing::info!(run_id = %self.run.run_id, "pipeline stopped early"),
            }
        }

        pipeline
    }

    fn stages(&self, pipeline: &mut PipelineRun) -> ControlFlow<()> {
        let identity = self.required(pipeline, Stage::VerifyIdentity, || self.verify_identity())?;

        self.optional(pipeline, Stage::EnsureCredentialProvider, || {
            self.ensure_credential_provider()
        })?;

        let target = self.required(pipeline, Stage::Bootstrap, || self.bootstrap(&identity))?;

        self.required(pipeline, Stage::Synth, || self.synth(&target))?;

        if self.run.mode.dry_run {
            self.required(pipeline, Stage::DryRunExit, || {
                self.ctx
                    .output
                    .info("Dry run: templates validated, nothing was deployed");
                Ok(())
            })?;
            return ControlFlow::Break(());
        }

        let document = self.required(pipeline, Stage::Apply, || self.apply(&target))?;

        let outputs = self.optional(pipeline, Stage::ExtractOutputs, || {
            self.extract_outputs(document.as_deref())
        })?;

        self.optional(pipeline, Stage::PersistOutputs, || {
            self.persist_outputs(outputs.as_ref())
        })?;

        if self.run.mode.run_tests {
            self.required(pipeline, Stage::VerificationTests, || self.verify(&target))?;
        } else {
            pipeline.record(
                Stage::VerificationTests,
                StageResult::Skipped("not requested".to_string()),
                Utc::now(),
            );
        }

        ControlFlow::Continue(())
    }

    /// Run a stage that either succeeds or aborts the pipeline
    fn required<T>(
        &self,
        pipeline: &mut PipelineRun,
        stage: Stage,
        body: impl FnOnce() -> DeployResult<T>,
    ) -> ControlFlow<(), T> {
        match self.optional(pipeline, stage, || body().map(Step::Done))? {
            Some(value) => ControlFlow::Continue(value),
            None => ControlFlow::Break(()),
        }
    }

    /// Run a stage that may skip; a skip is recorded and the pipeline continues
    fn optional<T>(
        &self,
        pipeline: &mut PipelineRun,
        stage: Stage,
        body: impl FnOnce() -> DeployResult<Step<T>>,
    ) -> ControlFlow<(), Option<T>> {
        let _span = tracing::info_span!("stage", %stage, run_id = %self.run.run_id).entered();
        let number = self
            .planned
            .iter()
            .position(|s| *s == stage)
            .map_or(0, |i| i + 1);
        self.ctx
            .output
            .step(number, self.planned.len(), stage.label());

        let started_at = Utc::now();
        tracing::debug!(%stage, "stage started");

        match body() {
            Ok(Step::Done(value)) => {
                pipeline.record(stage, StageResult::Success, started_at);
                ControlFlow::Continue(Some(value))
            }
            Ok(Step::Skip(reason)) => {
                self.ctx
                    .output
                    .warning(&format!("{} skipped: {}", stage.label(), reason));
                tracing::warn!(%stage, %reason, "stage skipped");
                pipeline.record(stage, StageResult::Skipped(reason), started_at);
                ControlFlow::Continue(None)
            }
            Err(err) => {
                self.ctx
                    .output
                    .error(&format!("{} failed: {}", stage.label(), err));
                pipeline.record(stage, StageResult::Failed(err), started_at);
                ControlFlow::Break(())
            }
        }
    }

    fn verify_identity(&self) -> DeployResult<CallerIdentity> {
        let identity = self
            .ctx
            .identity
            .verify()
            .map_err(|err| DeployError::Authentication(describe(&err)))?;

        self.ctx.output.key_value("Account", &identity.account);
        self.ctx.output.key_value("Caller", &identity.arn);
        Ok(identity)
    }

    fn ensure_credential_provider(&self) -> DeployResult<Step<()>> {
        let inputs = &self.run.inputs;
        if inputs.is_empty() {
            return self.skip_credential_provider();
        }

        if inputs.oauth_incomplete() {
            self.ctx.output.warning(
                "Only one of OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET is set; skipping the OAuth provider",
            );
        }

        let reconciler = CredentialProviderReconciler::new(&*self.ctx.control_plane, &self.ctx.store);
        let mut reconciled = 0;

        if let Some(api_key) = &inputs.api_key {
            let material = SecretMaterial::api_key_from_encoded(api_key.expose())?;
            let result = reconciler.reconcile(&self.run.api_key_provider_name, &material)?;
            self.ctx.output.success(&format!(
                "{} provider '{}' {}",
                result.kind, result.name, result.action
            ));
            self.ctx.output.key_value("Provider ARN", &result.provider_ref);
            reconciled += 1;
        }

        if let (Some(client_id), Some(client_secret)) =
            (&inputs.oauth_client_id, &inputs.oauth_client_secret)
        {
            let material = SecretMaterial::oauth(client_id, client_secret.expose())?;
            let result = reconciler.reconcile(&self.run.oauth_provider_name, &material)?;
            self.ctx.output.success(&format!(
                "{} provider '{}' {}",
                result.kind, result.name, result.action
            ));
            self.ctx.output.key_value("Provider ARN", &result.provider_ref);
            self.ctx
                .output
                .dimmed("Complete the OAuth authorization for this provider in the AgentCore console");
            reconciled += 1;
        }

        if reconciled > 0 {
            return Ok(Step::Done(()));
        }
        self.skip_credential_provider()
    }

    fn skip_credential_provider(&self) -> DeployResult<Step<()>> {
        if self.ctx.store.get_optional(ParamKey::CredentialProviderArn)?.is_none() {
            self.ctx.output.warning(&format!(
                "{} is not set; the stack will report {} until a provider is reconciled",
                self.ctx.store.path_for(ParamKey::CredentialProviderArn),
                NOT_SET_YET
            ));
        }

        Ok(Step::Skip(
            "no credential provider secret material in run input".to_string(),
        ))
    }

    fn bootstrap(&self, identity: &CallerIdentity) -> DeployResult<TargetEnvironment> {
        let provisioner = &self.ctx.provisioner;
        let installed = provisioner
            .check_installed()
            .map_err(|err| DeployError::Bootstrap(describe(&err)))?;
        if !installed {
            return Err(DeployError::Bootstrap(format!(
                "{} is not installed or not available in PATH",
                provisioner.get_name()
            )));
        }

        let account = match self.ctx.store.get_optional(ParamKey::AwsAccountId)? {
            Some(account) if account != identity.account => {
                return Err(DeployError::Bootstrap(format!(
                    "{} is {} but the caller belongs to account {}",
                    self.ctx.store.path_for(ParamKey::AwsAccountId),
                    account,
                    identity.account
                )));
            }
            Some(account) => account,
            None => {
                self.ctx.output.warning(&format!(
                    "{} is not set; using the caller's account {}",
                    self.ctx.store.path_for(ParamKey::AwsAccountId),
                    identity.account
                ));
                identity.account.clone()
            }
        };

        let region = match self.ctx.store.get_optional(ParamKey::AwsRegion)? {
            Some(region) if region != self.run.region => {
                return Err(DeployError::Bootstrap(format!(
                    "{} is {} but the config store in use is in region {}",
                    self.ctx.store.path_for(ParamKey::AwsRegion),
                    region,
                    self.run.region
                )));
            }
            Some(region) => region,
            None => {
                self.ctx.output.warning(&format!(
                    "{} is not set; using region {}",
                    self.ctx.store.path_for(ParamKey::AwsRegion),
                    self.run.region
                ));
                self.run.region.clone()
            }
        };

        let target = TargetEnvironment { account, region };
        self.ctx.output.key_value("Target", &target.to_string());

        provisioner
            .bootstrap(&target)
            .map_err(|err| DeployError::Bootstrap(describe(&err)))?;
        Ok(target)
    }

    fn synth(&self, target: &TargetEnvironment) -> DeployResult<()> {
        self.ctx
            .provisioner
            .synth(&self.run.stack_name, target)
            .map_err(|err| DeployError::Validation(describe(&err)))?;
        self.ctx
            .output
            .success(&format!("{} synthesized", self.run.stack_name));
        Ok(())
    }

    fn apply(&self, target: &TargetEnvironment) -> DeployResult<Option<String>> {
        let document = self
            .ctx
            .provisioner
            .deploy(&self.run.stack_name, target)
            .map_err(|err| DeployError::Provisioning(describe(&err)))?;
        self.ctx
            .output
            .success(&format!("{} deployed", self.run.stack_name));
        Ok(document)
    }

    fn extract_outputs(&self, document: Option<&str>) -> DeployResult<Step<StackOutput>> {
        let Some(raw) = document else {
            return Ok(Step::Skip("the provisioner wrote no output document".to_string()));
        };

        let outputs = OutputExtractor::new(&self.run.stack_name).extract(raw)?;

        if outputs.is_empty() {
            self.ctx.output.warning("The output document holds no stack outputs");
        }
        for (name, value) in &outputs.values {
            self.ctx.output.key_value(name, value);
        }

        if outputs.credential_provider_pending() {
            self.ctx.output.warning(&format!(
                "The stack reports credential provider {}; reconcile a provider and deploy again",
                NOT_SET_YET
            ));
        }

        Ok(Step::Done(outputs))
    }

    fn persist_outputs(&self, outputs: Option<&StackOutput>) -> DeployResult<Step<()>> {
        let Some(outputs) = outputs else {
            return Ok(Step::Skip("no stack outputs were extracted".to_string()));
        };

        let Some(gateway_id) = outputs.gateway_id() else {
            return Ok(Step::Skip("stack outputs carry no GatewayID".to_string()));
        };

        self.ctx.store.put(ParamKey::GatewayId, gateway_id)?;
        self.ctx.output.success(&format!(
            "Gateway id stored at {}",
            self.ctx.store.path_for(ParamKey::GatewayId)
        ));
        if let Some(url) = outputs.gateway_url() {
            self.ctx.output.key_value("Gateway URL", url);
        }
        Ok(Step::Done(()))
    }

    fn verify(&self, target: &TargetEnvironment) -> DeployResult<()> {
        let report = run_verification(&*self.ctx.verifier, &self.ctx.store, &target.region)?;

        for test in &report.tests {
            self.ctx.output.status_check(
                &test.name,
                test.status != TestStatus::Failed,
                test.message.as_deref().unwrap_or(""),
            );
        }
        self.ctx.output.success(&format!(
            "{} test(s) passed in {}ms",
            report.count(TestStatus::Passed),
            report.duration_ms
        ));
        Ok(())
    }
}
